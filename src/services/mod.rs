pub mod availability;
pub mod calendar;
pub mod coordinator;
pub mod ics;
pub mod repository;
pub mod scheduling;
pub mod slots;
