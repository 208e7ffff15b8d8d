use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::booking::{ContactChoice, PipelineChoice};
use super::time::WallTime;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "confirmed" => AppointmentStatus::Confirmed,
            "cancelled" => AppointmentStatus::Cancelled,
            "completed" => AppointmentStatus::Completed,
            _ => AppointmentStatus::Pending,
        }
    }

    pub fn is_active(&self) -> bool {
        *self != AppointmentStatus::Cancelled
    }
}

// Lightweight record used for fast start-time conflict checks. The date is
// implied by the query that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookedSlot {
    pub start_time: WallTime,
    pub end_time: WallTime,
    pub status: AppointmentStatus,
    pub appointment_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub advisor_id: String,
    pub date: NaiveDate,
    pub start_time: WallTime,
    pub end_time: WallTime,
    pub status: AppointmentStatus,
    pub customer_id: Option<String>,
    pub pipeline_id: Option<String>,
    pub stage_id: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    pub fn booked_slot(&self) -> BookedSlot {
        BookedSlot {
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            appointment_id: self.id.clone(),
        }
    }

    // Length in minutes, treating an end at or before the start as crossing midnight.
    pub fn duration_minutes(&self) -> u16 {
        let start = self.start_time.minutes();
        let end = self.end_time.minutes();
        if end > start {
            end - start
        } else {
            end + super::time::MINUTES_PER_DAY - start
        }
    }
}

// What the engine hands to the appointment collaborator on create/update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRequest {
    pub advisor_id: String,
    pub date: NaiveDate,
    pub start_time: WallTime,
    pub end_time: WallTime,
    pub status: AppointmentStatus,
    pub contact: ContactChoice,
    pub pipeline: PipelineChoice,
    pub description: Option<String>,
    pub color: Option<String>,
}
