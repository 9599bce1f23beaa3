// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Screen {
    Home,
    Booking,
    Steps,
    Chat,
}

impl Screen {
    pub const DESTINATIONS: [Self; 3] = [Self::Booking, Self::Steps, Self::Chat];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Booking => "Book a Doctor",
            Self::Steps => "Step Counter",
            Self::Chat => "AI Health Assistant",
        }
    }
}

/// Keys under which the models persist their state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingKey {
    ChatHistory,
    Appointments,
    StepCountDate,
    TodaySteps,
    WeekHistory,
}

impl SettingKey {
    pub const ALL: [Self; 5] = [
        Self::ChatHistory,
        Self::Appointments,
        Self::StepCountDate,
        Self::TodaySteps,
        Self::WeekHistory,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChatHistory => "chatHistory",
            Self::Appointments => "appointments",
            Self::StepCountDate => "stepCountDate",
            Self::TodaySteps => "todaySteps",
            Self::WeekHistory => "weekHistory",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub text: String,
    pub is_user: bool,
    pub time: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            text: text.into(),
            is_user: true,
            time: clock_label(now),
        }
    }

    pub fn assistant(text: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            text: text.into(),
            is_user: false,
            time: clock_label(now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Doctor {
    pub name: &'static str,
    pub specialty: &'static str,
    pub experience: &'static str,
    pub rating: &'static str,
    pub icon: &'static str,
}

pub const DOCTORS: [Doctor; 5] = [
    Doctor {
        name: "Dr. Sarah Johnson",
        specialty: "Cardiologist",
        experience: "15 years experience",
        rating: "4.8/5",
        icon: "👩‍⚕️",
    },
    Doctor {
        name: "Dr. Michael Chen",
        specialty: "Neurologist",
        experience: "12 years experience",
        rating: "4.9/5",
        icon: "👨‍⚕️",
    },
    Doctor {
        name: "Dr. Emily Parker",
        specialty: "Pediatrician",
        experience: "10 years experience",
        rating: "4.7/5",
        icon: "👩‍⚕️",
    },
    Doctor {
        name: "Dr. David Kumar",
        specialty: "Orthopedic",
        experience: "18 years experience",
        rating: "4.9/5",
        icon: "👨‍⚕️",
    },
    Doctor {
        name: "Dr. Lisa Anderson",
        specialty: "Dermatologist",
        experience: "8 years experience",
        rating: "4.6/5",
        icon: "👩‍⚕️",
    },
];

pub const SPECIALTIES: [&str; 8] = [
    "General Consultation",
    "Cardiology",
    "Neurology",
    "Pediatrics",
    "Orthopedics",
    "Dermatology",
    "Dentistry",
    "Ophthalmology",
];

pub const TIME_SLOTS: [&str; 8] = [
    "09:00 AM", "10:00 AM", "11:00 AM", "12:00 PM", "02:00 PM", "03:00 PM", "04:00 PM",
    "05:00 PM",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub doctor: String,
    pub specialty: String,
    pub patient_name: String,
    pub patient_age: String,
    pub patient_phone: String,
    pub date: String,
    pub time: String,
    pub timestamp: String,
}

/// A modal message for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub ok_label: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ok_label: "OK".to_owned(),
        }
    }

    pub fn with_ok_label(mut self, label: impl Into<String>) -> Self {
        self.ok_label = label.into();
        self
    }
}

pub const CANCEL_LABEL: &str = "Cancel";

/// An action sheet: the shell shows `choices` plus a cancel entry and reports
/// back a [`PickerOutcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picker {
    pub title: String,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    Cancel,
    Chosen(String),
}

impl PickerOutcome {
    pub fn from_label(label: &str) -> Self {
        if label == CANCEL_LABEL {
            Self::Cancel
        } else {
            Self::Chosen(label.to_owned())
        }
    }
}

/// Wall-clock time in the local offset, falling back to UTC when the offset
/// cannot be determined (for example in multi-threaded processes on Unix).
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub fn clock_label(now: OffsetDateTime) -> String {
    now.format(&format_description!("[hour]:[minute]"))
        .unwrap_or_else(|_| format!("{:02}:{:02}", now.hour(), now.minute()))
}

#[cfg(test)]
mod tests {
    use super::{Appointment, ChatMessage, PickerOutcome, SettingKey, clock_label};
    use anyhow::Result;
    use time::macros::datetime;

    #[test]
    fn setting_keys_round_trip_through_storage_names() {
        for key in SettingKey::ALL {
            assert_eq!(SettingKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(SettingKey::parse("nope"), None);
    }

    #[test]
    fn chat_message_uses_camel_case_fields() -> Result<()> {
        let message = ChatMessage::user("hi", datetime!(2026-01-05 08:04 UTC));
        let encoded = serde_json::to_string(&message)?;
        assert_eq!(encoded, r#"{"text":"hi","isUser":true,"time":"08:04"}"#);
        Ok(())
    }

    #[test]
    fn appointment_serializes_patient_fields_in_camel_case() -> Result<()> {
        let appointment = Appointment {
            doctor: "Dr. Michael Chen".to_owned(),
            specialty: "Neurology".to_owned(),
            patient_name: "Avery".to_owned(),
            patient_age: "41".to_owned(),
            patient_phone: "555-0100".to_owned(),
            date: "Mon, Jan 5".to_owned(),
            time: "09:00 AM".to_owned(),
            timestamp: "2026-01-05T08:00:00Z".to_owned(),
        };
        let encoded = serde_json::to_string(&appointment)?;
        assert!(encoded.contains("\"patientName\":\"Avery\""));
        assert!(encoded.contains("\"patientPhone\":\"555-0100\""));
        Ok(())
    }

    #[test]
    fn clock_label_pads_hours_and_minutes() {
        assert_eq!(clock_label(datetime!(2026-01-05 7:03 UTC)), "07:03");
        assert_eq!(clock_label(datetime!(2026-01-05 23:59 UTC)), "23:59");
    }

    #[test]
    fn picker_outcome_maps_cancel_label() {
        assert_eq!(PickerOutcome::from_label("Cancel"), PickerOutcome::Cancel);
        assert_eq!(
            PickerOutcome::from_label("10:00 AM"),
            PickerOutcome::Chosen("10:00 AM".to_owned())
        );
    }
}
