// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

use crate::{
    Alert, Appointment, Changes, DOCTORS, Doctor, Picker, PickerOutcome, SPECIALTIES, SettingKey,
    SettingsStore, TIME_SLOTS, read_json_or, write_json,
};

pub const DATE_PLACEHOLDER: &str = "Select Date";
pub const TIME_PLACEHOLDER: &str = "Select Time";
pub const BOOKABLE_DAYS: i64 = 7;

const UNKNOWN_DOCTOR: &str = "Unknown Doctor";
const UNKNOWN_SPECIALTY: &str = "Unknown Specialty";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingProperty {
    SelectedDoctorIndex,
    SelectedDoctor,
    IsDoctorSelected,
    SelectedSpecialtyIndex,
    PatientName,
    PatientAge,
    PatientPhone,
    SelectedDate,
    SelectedTime,
}

/// Why a booking was not committed. Variants are ordered the way the form is
/// checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingRejection {
    MissingName,
    InvalidAge,
    MissingPhone,
    MissingDate,
    MissingTime,
    StorageFailed,
}

impl BookingRejection {
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingName => "Please enter patient name",
            Self::InvalidAge => "Please enter a valid age",
            Self::MissingPhone => "Please enter phone number",
            Self::MissingDate => "Please select appointment date",
            Self::MissingTime => "Please select appointment time",
            Self::StorageFailed => "An error occurred while booking. Please try again.",
        }
    }
}

impl std::fmt::Display for BookingRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for BookingRejection {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    Booked {
        appointment: Appointment,
        message: String,
    },
    Rejected(BookingRejection),
}

impl BookingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Booked { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Booked { message, .. } => message,
            Self::Rejected(rejection) => rejection.message(),
        }
    }

    pub fn alert(&self) -> Alert {
        match self {
            Self::Booked { message, .. } => {
                Alert::new("✅ Booking Successful!", message.clone()).with_ok_label("Great!")
            }
            Self::Rejected(rejection) => Alert::new("❌ Booking Failed", rejection.message()),
        }
    }
}

#[derive(Debug)]
pub struct BookingModel {
    selected_doctor_index: usize,
    selected_doctor: Option<usize>,
    selected_specialty_index: usize,
    patient_name: String,
    patient_age: String,
    patient_phone: String,
    selected_date: String,
    selected_time: String,
    changes: Changes<BookingProperty>,
}

impl Default for BookingModel {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingModel {
    pub fn new() -> Self {
        Self {
            selected_doctor_index: 0,
            selected_doctor: (!DOCTORS.is_empty()).then_some(0),
            selected_specialty_index: 0,
            patient_name: String::new(),
            patient_age: String::new(),
            patient_phone: String::new(),
            selected_date: DATE_PLACEHOLDER.to_owned(),
            selected_time: TIME_PLACEHOLDER.to_owned(),
            changes: Changes::default(),
        }
    }

    pub fn doctors(&self) -> &'static [Doctor] {
        &DOCTORS
    }

    pub fn specialties(&self) -> &'static [&'static str] {
        &SPECIALTIES
    }

    pub fn selected_doctor_index(&self) -> usize {
        self.selected_doctor_index
    }

    pub fn selected_doctor(&self) -> Option<&'static Doctor> {
        self.selected_doctor.and_then(|index| DOCTORS.get(index))
    }

    pub fn is_doctor_selected(&self) -> bool {
        self.selected_doctor().is_some()
    }

    pub fn selected_specialty_index(&self) -> usize {
        self.selected_specialty_index
    }

    pub fn selected_specialty(&self) -> &'static str {
        SPECIALTIES
            .get(self.selected_specialty_index)
            .copied()
            .unwrap_or(UNKNOWN_SPECIALTY)
    }

    pub fn patient_name(&self) -> &str {
        &self.patient_name
    }

    pub fn patient_age(&self) -> &str {
        &self.patient_age
    }

    pub fn patient_phone(&self) -> &str {
        &self.patient_phone
    }

    pub fn selected_date(&self) -> &str {
        &self.selected_date
    }

    pub fn selected_time(&self) -> &str {
        &self.selected_time
    }

    pub fn take_changes(&mut self) -> Vec<BookingProperty> {
        self.changes.drain()
    }

    pub fn select_doctor(&mut self, index: usize) {
        if index >= DOCTORS.len() {
            tracing::warn!(index, "invalid doctor index");
            return;
        }

        self.selected_doctor_index = index;
        self.selected_doctor = Some(index);
        self.changes.notify_all(&[
            BookingProperty::SelectedDoctorIndex,
            BookingProperty::SelectedDoctor,
            BookingProperty::IsDoctorSelected,
        ]);
        tracing::debug!(doctor = DOCTORS[index].name, "doctor selected");
    }

    /// The index comes from a picker over [`SPECIALTIES`] and is trusted.
    pub fn select_specialty(&mut self, index: usize) {
        self.selected_specialty_index = index;
        self.changes.notify(BookingProperty::SelectedSpecialtyIndex);
    }

    pub fn set_patient_name(&mut self, value: &str) {
        if self.patient_name != value {
            self.patient_name = value.to_owned();
            self.changes.notify(BookingProperty::PatientName);
        }
    }

    pub fn set_patient_age(&mut self, value: &str) {
        if self.patient_age != value {
            self.patient_age = value.to_owned();
            self.changes.notify(BookingProperty::PatientAge);
        }
    }

    pub fn set_patient_phone(&mut self, value: &str) {
        if self.patient_phone != value {
            self.patient_phone = value.to_owned();
            self.changes.notify(BookingProperty::PatientPhone);
        }
    }

    pub fn date_picker(&self, today: Date) -> Picker {
        Picker {
            title: "Select Appointment Date".to_owned(),
            choices: upcoming_dates(today),
        }
    }

    pub fn time_picker(&self) -> Picker {
        Picker {
            title: "Select Appointment Time".to_owned(),
            choices: TIME_SLOTS.iter().map(|slot| (*slot).to_owned()).collect(),
        }
    }

    pub fn choose_date(&mut self, outcome: PickerOutcome) {
        if let PickerOutcome::Chosen(date) = outcome {
            self.selected_date = date;
            self.changes.notify(BookingProperty::SelectedDate);
        }
    }

    pub fn choose_time(&mut self, outcome: PickerOutcome) {
        if let PickerOutcome::Chosen(time) = outcome {
            self.selected_time = time;
            self.changes.notify(BookingProperty::SelectedTime);
        }
    }

    pub fn validate(&self) -> std::result::Result<(), BookingRejection> {
        if self.patient_name.trim().is_empty() {
            return Err(BookingRejection::MissingName);
        }
        if self.patient_age.trim().is_empty() || !is_numeric(&self.patient_age) {
            return Err(BookingRejection::InvalidAge);
        }
        if self.patient_phone.trim().is_empty() {
            return Err(BookingRejection::MissingPhone);
        }
        if self.selected_date == DATE_PLACEHOLDER {
            return Err(BookingRejection::MissingDate);
        }
        if self.selected_time == TIME_PLACEHOLDER {
            return Err(BookingRejection::MissingTime);
        }
        Ok(())
    }

    /// Validates the draft and appends it to the stored appointment list.
    /// Failures are returned as values; nothing propagates.
    pub fn book_appointment<S: SettingsStore + ?Sized>(
        &self,
        store: &mut S,
        now: OffsetDateTime,
    ) -> BookingOutcome {
        if let Err(rejection) = self.validate() {
            return BookingOutcome::Rejected(rejection);
        }

        match self.commit(store, now) {
            Ok(appointment) => {
                let message = self.confirmation_message();
                tracing::info!(
                    doctor = %appointment.doctor,
                    date = %appointment.date,
                    time = %appointment.time,
                    "appointment booked"
                );
                BookingOutcome::Booked {
                    appointment,
                    message,
                }
            }
            Err(error) => {
                tracing::error!("booking appointment failed: {error:#}");
                BookingOutcome::Rejected(BookingRejection::StorageFailed)
            }
        }
    }

    fn commit<S: SettingsStore + ?Sized>(
        &self,
        store: &mut S,
        now: OffsetDateTime,
    ) -> Result<Appointment> {
        let timestamp = now
            .to_offset(UtcOffset::UTC)
            .format(&Rfc3339)
            .context("format booking timestamp")?;

        let appointment = Appointment {
            doctor: self.doctor_name().to_owned(),
            specialty: self.selected_specialty().to_owned(),
            patient_name: self.patient_name.clone(),
            patient_age: self.patient_age.clone(),
            patient_phone: self.patient_phone.clone(),
            date: self.selected_date.clone(),
            time: self.selected_time.clone(),
            timestamp,
        };

        let mut stored = match read_json_or(store, SettingKey::Appointments, Value::Null) {
            Value::Array(entries) => entries,
            _ => Vec::new(),
        };
        stored.push(serde_json::to_value(&appointment).context("encode appointment")?);
        write_json(store, SettingKey::Appointments, &stored)?;

        Ok(appointment)
    }

    fn doctor_name(&self) -> &'static str {
        self.selected_doctor()
            .map(|doctor| doctor.name)
            .unwrap_or(UNKNOWN_DOCTOR)
    }

    fn confirmation_message(&self) -> String {
        format!(
            "Appointment booked successfully!\n\nDoctor: {}\nSpecialty: {}\nDate: {}\nTime: {}\n\nPatient: {}",
            self.doctor_name(),
            self.selected_specialty(),
            self.selected_date,
            self.selected_time,
            self.patient_name,
        )
    }
}

/// Reads back every stored appointment, skipping entries that no longer
/// decode.
pub fn load_appointments<S: SettingsStore + ?Sized>(store: &S) -> Vec<Appointment> {
    let Value::Array(entries) = read_json_or(store, SettingKey::Appointments, Value::Null) else {
        return Vec::new();
    };
    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect()
}

pub fn upcoming_dates(today: Date) -> Vec<String> {
    (0..BOOKABLE_DAYS)
        .filter_map(|offset| today.checked_add(Duration::days(offset)))
        .filter_map(|date| {
            date.format(&format_description!(
                "[weekday repr:short], [month repr:short] [day padding:none]"
            ))
            .ok()
        })
        .collect()
}

fn is_numeric(raw: &str) -> bool {
    raw.trim()
        .parse::<f64>()
        .map(|value| !value.is_nan())
        .unwrap_or(false)
}
