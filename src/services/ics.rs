use crate::models::{AdvisorSchedule, Appointment};
use crate::services::scheduling::booking_interval;

// The schedule places slots from the after-midnight part of an overnight
// window on the following calendar day.
pub fn generate_ics(appointment: &Appointment, schedule: &AdvisorSchedule, business_name: &str) -> String {
    let (start, end) = booking_interval(
        schedule,
        appointment.date,
        appointment.start_time,
        appointment.end_time,
    );

    let dtstart = start.format("%Y%m%dT%H%M%S").to_string();
    let dtend = end.format("%Y%m%dT%H%M%S").to_string();
    let dtstamp = appointment.created_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("{}@advisorbook", appointment.id);

    let summary = format!("Consultation with {business_name}");
    let description = appointment
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or("No additional notes")
        .replace('\n', "\\n");
    let status = match appointment.status {
        crate::models::AppointmentStatus::Cancelled => "CANCELLED",
        crate::models::AppointmentStatus::Pending => "TENTATIVE",
        _ => "CONFIRMED",
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Advisorbook//Booking Engine//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}
