pub mod appointment;
pub mod booking;
pub mod calendar;
pub mod schedule;
pub mod slot;
pub mod time;

pub use appointment::{Appointment, AppointmentRequest, AppointmentStatus, BookedSlot};
pub use booking::{BookingForm, ContactChoice, FormEdit, PipelineChoice};
pub use calendar::{DayCell, MonthGrid, YearMonth};
pub use schedule::{AdvisorSchedule, ScheduleMode, WeekdaySchedule, WeeklySchedule};
pub use slot::{CandidateSlot, SlotDuration, SlotView};
pub use time::WallTime;
