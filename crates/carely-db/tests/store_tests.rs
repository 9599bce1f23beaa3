// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use carely_app::{
    BookingModel, ChatModel, PickerOutcome, SensorCapability, SettingKey, SettingsStore,
    StepModel, load_appointments,
};
use carely_db::{Store, validate_db_path};
use carely_testkit::{
    FixedStepSource, PatientFaker, ScriptedBackend, fixture_date, fixture_datetime, temp_db_path,
};

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("").is_err());
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("/tmp/carely.db").is_ok());
    assert!(validate_db_path(":memory:").is_ok());
}

#[test]
fn values_survive_reopen() -> Result<()> {
    let (_dir, path) = temp_db_path()?;

    {
        let mut store = Store::open(&path)?;
        store.bootstrap()?;
        store.set_string(SettingKey::StepCountDate, "2026-02-19")?;
        store.set_number(SettingKey::TodaySteps, 4_210.0)?;
        store.set_string(SettingKey::ChatHistory, "[]")?;
        store.remove(SettingKey::ChatHistory)?;
    }

    let store = Store::open(&path)?;
    store.bootstrap()?;
    assert_eq!(
        store.get_string(SettingKey::StepCountDate)?.as_deref(),
        Some("2026-02-19")
    );
    assert_eq!(store.get_number(SettingKey::TodaySteps)?, Some(4_210.0));
    assert_eq!(store.get_string(SettingKey::ChatHistory)?, None);
    assert_eq!(
        store.stored_keys()?,
        vec![SettingKey::StepCountDate, SettingKey::TodaySteps]
    );
    Ok(())
}

#[test]
fn bootstrap_rejects_schema_missing_required_column() -> Result<()> {
    let store = Store::open_memory()?;
    store
        .raw_connection()
        .execute_batch("CREATE TABLE settings (key TEXT PRIMARY KEY, value TEXT NOT NULL);")?;

    let error = store
        .bootstrap()
        .expect_err("schema without updated_at should be rejected");
    assert!(error.to_string().contains("updated_at"), "{error:#}");
    Ok(())
}

#[test]
fn bootstrap_rejects_foreign_database() -> Result<()> {
    let store = Store::open_memory()?;
    store
        .raw_connection()
        .execute_batch("CREATE TABLE recipes (id INTEGER PRIMARY KEY);")?;

    let error = store
        .bootstrap()
        .expect_err("database without settings table should be rejected");
    assert!(error.to_string().contains("settings"), "{error:#}");
    Ok(())
}

#[test]
fn booking_persists_through_sqlite() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    let patient = PatientFaker::new(8).patient();

    {
        let mut store = Store::open(&path)?;
        store.bootstrap()?;
        let mut model = BookingModel::new();
        model.set_patient_name(&patient.name);
        model.set_patient_age(&patient.age);
        model.set_patient_phone(&patient.phone);
        model.choose_date(PickerOutcome::Chosen("Fri, Feb 20".to_owned()));
        model.choose_time(PickerOutcome::Chosen("11:00 AM".to_owned()));
        assert!(model.book_appointment(&mut store, fixture_datetime()).is_success());
    }

    let store = Store::open(&path)?;
    let appointments = load_appointments(&store);
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].patient_name, patient.name);
    assert_eq!(appointments[0].doctor, "Dr. Sarah Johnson");
    Ok(())
}

#[test]
fn chat_and_steps_share_one_store() -> Result<()> {
    let mut store = Store::open_memory()?;
    store.bootstrap()?;

    let backend = ScriptedBackend::new().with_reply("Stay hydrated.");
    let mut chat = ChatModel::load(&store);
    chat.set_message_input("Any tips?");
    assert_eq!(chat.send_message(&backend, &mut store, fixture_datetime), None);

    let mut source = FixedStepSource::new(40);
    let mut steps = StepModel::load(&mut store, SensorCapability::Available, fixture_date());
    steps.tick(&mut source, &mut store);
    steps.reset_steps(&mut store);

    assert_eq!(ChatModel::load(&store).messages().len(), 2);
    assert_eq!(store.get_number(SettingKey::TodaySteps)?, Some(0.0));
    assert!(store.updated_at(SettingKey::ChatHistory)?.is_some());
    Ok(())
}

#[test]
fn demo_seed_restores_today_on_load() -> Result<()> {
    let mut store = Store::open_memory()?;
    store.bootstrap()?;
    store.seed_demo_data(fixture_date())?;

    let model = StepModel::load(&mut store, SensorCapability::Available, fixture_date());
    assert_eq!(model.steps_today(), 3_456);
    assert_eq!(model.history().len(), 7);
    assert_eq!(model.week_bars()[5].steps, 8_234);
    Ok(())
}
