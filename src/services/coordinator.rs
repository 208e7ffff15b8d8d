use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::errors::{BookingError, BookingField};
use crate::models::{
    AdvisorSchedule, Appointment, AppointmentRequest, AppointmentStatus, BookedSlot, BookingForm,
    CandidateSlot, ContactChoice, DayCell, FormEdit, MonthGrid, PipelineChoice, SlotDuration,
    SlotView, YearMonth,
};
use crate::services::availability::{is_past_date, slots_for_day, DayBookings};
use crate::services::calendar::{
    appointment_dates, build_month_grid, first_available_day, offers_slots, CalendarCursor,
};
use crate::services::repository::{AppointmentRepository, ScheduleRepository};
use crate::services::slots::OvernightPolicy;

// What differs between the admin dialog and the public booking page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfacePolicy {
    pub overnight: OvernightPolicy,
    pub allow_new_pipeline: bool,
    // Used when the form carries no pipeline of its own.
    pub default_pipeline: Option<PipelineChoice>,
}

impl SurfacePolicy {
    pub fn admin() -> Self {
        Self {
            overnight: OvernightPolicy::Wrap,
            allow_new_pipeline: true,
            default_pipeline: None,
        }
    }

    pub fn public(default_pipeline: Option<PipelineChoice>) -> Self {
        Self {
            overnight: OvernightPolicy::SameDayOnly,
            allow_new_pipeline: false,
            default_pipeline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingPhase {
    Idle,
    DateSelected,
    SlotSelected,
    Submitting,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Error(BookingError),
    Saved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTarget {
    pub id: String,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingState {
    pub phase: BookingPhase,
    pub date: Option<NaiveDate>,
    pub duration: SlotDuration,
    pub slot: Option<CandidateSlot>,
    pub slots: Vec<SlotView>,
    pub form: BookingForm,
    pub editing: Option<EditTarget>,
    pub notice: Option<Notice>,
}

impl Default for BookingState {
    fn default() -> Self {
        Self {
            phase: BookingPhase::Idle,
            date: None,
            duration: SlotDuration::default(),
            slot: None,
            slots: vec![],
            form: BookingForm::default(),
            editing: None,
            notice: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookingEvent {
    Reset,
    Prefilled {
        editing: Option<EditTarget>,
        form: BookingForm,
        duration: SlotDuration,
    },
    DateChosen {
        date: NaiveDate,
        slots: Vec<SlotView>,
    },
    DurationChanged {
        duration: SlotDuration,
        slots: Vec<SlotView>,
    },
    SlotChosen(CandidateSlot),
    FormEdited(FormEdit),
    Noticed(BookingError),
    SubmitStarted,
    SubmitSucceeded,
    SubmitFailed(BookingError),
    Recovered,
    SlotInvalidated {
        slots: Vec<SlotView>,
    },
}

// The single transition function; events that do not apply in the current
// phase leave the state untouched.
pub fn reduce(mut state: BookingState, event: BookingEvent) -> BookingState {
    use BookingPhase::*;

    let busy = state.phase == Submitting;
    match event {
        BookingEvent::Reset => return BookingState::default(),
        BookingEvent::Prefilled {
            editing,
            form,
            duration,
        } if !busy => {
            state.editing = editing;
            state.form = form;
            state.duration = duration;
        }
        BookingEvent::DateChosen { date, slots } if !busy => {
            state.date = Some(date);
            state.slot = None;
            state.slots = slots;
            state.phase = DateSelected;
            state.notice = None;
        }
        BookingEvent::DurationChanged { duration, slots } if !busy => {
            state.duration = duration;
            state.slot = None;
            state.slots = slots;
            if state.date.is_some() {
                state.phase = DateSelected;
            }
        }
        BookingEvent::SlotChosen(slot) if matches!(state.phase, DateSelected | SlotSelected) => {
            let selectable = state
                .slots
                .iter()
                .any(|v| v.available && v.slot() == slot);
            if selectable {
                state.slot = Some(slot);
                state.phase = SlotSelected;
                state.notice = None;
            }
        }
        BookingEvent::FormEdited(edit) if !busy => state.form.apply(edit),
        BookingEvent::Noticed(err) => state.notice = Some(Notice::Error(err)),
        BookingEvent::SubmitStarted if state.phase == SlotSelected => {
            state.phase = Submitting;
            state.notice = None;
        }
        BookingEvent::SubmitSucceeded if busy => {
            return BookingState {
                phase: Success,
                notice: Some(Notice::Saved),
                ..BookingState::default()
            };
        }
        BookingEvent::SubmitFailed(err) if busy => {
            state.phase = Failed;
            state.notice = Some(Notice::Error(err));
        }
        BookingEvent::Recovered if state.phase == Failed => state.phase = SlotSelected,
        BookingEvent::SlotInvalidated { slots } if matches!(state.phase, Failed | SlotSelected) => {
            state.slot = None;
            state.slots = slots;
            state.phase = DateSelected;
        }
        _ => {}
    }
    state
}

// Everything booked on the selected date, as last fetched.
#[derive(Debug, Clone, Default)]
struct DaySnapshot {
    date: Option<NaiveDate>,
    booked: Vec<BookedSlot>,
    appointments: Vec<Appointment>,
}

pub struct SubmitTicket {
    session: u64,
    target: Option<String>,
    request: AppointmentRequest,
}

impl SubmitTicket {
    pub fn request(&self) -> &AppointmentRequest {
        &self.request
    }

    pub async fn send(self, repo: &dyn AppointmentRepository) -> SubmitOutcome {
        let result = match &self.target {
            Some(id) => repo.update(id, &self.request).await,
            None => repo.create(&self.request).await,
        };
        SubmitOutcome {
            session: self.session,
            result,
        }
    }
}

pub struct SubmitOutcome {
    session: u64,
    pub result: Result<Appointment, BookingError>,
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub struct BookingCoordinator {
    advisor_id: String,
    policy: SurfacePolicy,
    schedules: Arc<dyn ScheduleRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    clock: fn() -> NaiveDateTime,
    seed_horizon_days: u32,

    state: BookingState,
    schedule: AdvisorSchedule,
    cursor: CalendarCursor,
    month_appointments: Vec<Appointment>,
    day: DaySnapshot,
    session: u64,
    open: bool,
}

impl BookingCoordinator {
    pub fn new(
        advisor_id: impl Into<String>,
        policy: SurfacePolicy,
        schedules: Arc<dyn ScheduleRepository>,
        appointments: Arc<dyn AppointmentRepository>,
    ) -> Self {
        let today = local_now().date();
        Self {
            advisor_id: advisor_id.into(),
            policy,
            schedules,
            appointments,
            clock: local_now,
            seed_horizon_days: 30,
            state: BookingState::default(),
            schedule: AdvisorSchedule::missing(),
            cursor: CalendarCursor::new(YearMonth::of(today)),
            month_appointments: vec![],
            day: DaySnapshot::default(),
            session: 0,
            open: false,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self.cursor = CalendarCursor::new(YearMonth::of(clock().date()));
        self
    }

    pub fn with_seed_horizon(mut self, days: u32) -> Self {
        self.seed_horizon_days = days;
        self
    }

    pub fn state(&self) -> &BookingState {
        &self.state
    }

    pub fn phase(&self) -> BookingPhase {
        self.state.phase
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn schedule(&self) -> &AdvisorSchedule {
        &self.schedule
    }

    pub fn displayed_month(&self) -> YearMonth {
        self.cursor.displayed
    }

    pub fn appointment_repository(&self) -> Arc<dyn AppointmentRepository> {
        Arc::clone(&self.appointments)
    }

    fn dispatch(&mut self, event: BookingEvent) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, event);
    }

    fn today(&self) -> NaiveDate {
        (self.clock)().date()
    }

    pub async fn open(&mut self, preselected: Option<NaiveDate>) {
        self.start_session().await;

        let accepted = match preselected {
            Some(date) => self.select_date(date).await,
            None => false,
        };
        if !accepted {
            self.seed_date().await;
        }
    }

    // Preloads an existing appointment so a valid submit updates it.
    pub async fn open_for_edit(&mut self, appointment: &Appointment) {
        self.start_session().await;

        let contact = appointment
            .customer_id
            .clone()
            .map(|customer_id| ContactChoice::Existing { customer_id });
        let pipeline = match (&appointment.pipeline_id, &appointment.stage_id) {
            (Some(p), Some(s)) => Some(PipelineChoice::Existing {
                pipeline_id: p.clone(),
                stage_id: s.clone(),
            }),
            _ => None,
        };
        let length = appointment.duration_minutes();
        let duration = SlotDuration::from_minutes(length);
        self.dispatch(BookingEvent::Prefilled {
            editing: Some(EditTarget {
                id: appointment.id.clone(),
                status: appointment.status,
            }),
            form: BookingForm {
                contact,
                pipeline,
                description: appointment.description.clone(),
                color: appointment.color.clone(),
            },
            duration: duration.unwrap_or_default(),
        });

        if !self.select_date(appointment.date).await {
            return;
        }
        // Only the exact slot the appointment holds is preselected; anything
        // else would silently change its time on submit.
        let own = duration.and_then(|_| {
            self.state
                .slots
                .iter()
                .find(|v| v.start_time == appointment.start_time && v.end_time == appointment.end_time)
                .map(SlotView::slot)
        });
        match own {
            Some(slot) => {
                self.select_slot(slot);
            }
            None => {
                tracing::info!(id = %appointment.id, length, "appointment does not match a bookable slot");
                self.dispatch(BookingEvent::Noticed(BookingError::Invalid(format!(
                    "{} ({length} minutes) is not a bookable slot, pick a new one",
                    CandidateSlot {
                        start_time: appointment.start_time,
                        end_time: appointment.end_time,
                    }
                    .label()
                ))));
            }
        }
    }

    async fn start_session(&mut self) {
        self.session += 1;
        self.open = true;
        self.dispatch(BookingEvent::Reset);
        self.day = DaySnapshot::default();
        self.cursor = CalendarCursor::new(YearMonth::of(self.today()));

        self.schedule = match self.schedules.get_schedule(&self.advisor_id).await {
            Ok(Some(schedule)) => schedule,
            Ok(None) => {
                tracing::warn!(advisor_id = %self.advisor_id, "no schedule found, showing no availability");
                self.dispatch(BookingEvent::Noticed(BookingError::MissingSchedule(
                    self.advisor_id.clone(),
                )));
                AdvisorSchedule::missing()
            }
            Err(e) => {
                tracing::warn!(advisor_id = %self.advisor_id, error = %e, "failed to load schedule");
                self.dispatch(BookingEvent::Noticed(e));
                AdvisorSchedule::missing()
            }
        };
        self.refresh().await;
    }

    async fn seed_date(&mut self) {
        let today = self.today();
        match first_available_day(
            &self.schedule,
            today,
            self.seed_horizon_days,
            self.state.duration,
            self.policy.overnight,
        ) {
            Some(date) => {
                self.select_date(date).await;
            }
            None => {
                tracing::debug!(advisor_id = %self.advisor_id, "no available day within seed horizon");
            }
        }
    }

    pub fn close(&mut self) {
        self.open = false;
        self.session += 1;
        self.day = DaySnapshot::default();
        self.dispatch(BookingEvent::Reset);
    }

    // Re-fetches the appointments of the displayed month.
    pub async fn refresh(&mut self) {
        let month = self.cursor.displayed;
        match self
            .appointments
            .list(&self.advisor_id, month.first_day(), month.last_day())
            .await
        {
            Ok(list) => self.month_appointments = list,
            Err(e) => {
                tracing::warn!(advisor_id = %self.advisor_id, error = %e, "failed to load appointments");
                self.dispatch(BookingEvent::Noticed(e));
            }
        }
    }

    pub async fn next_month(&mut self) {
        self.cursor.next_month();
        self.refresh().await;
    }

    pub async fn prev_month(&mut self) {
        self.cursor.prev_month();
        self.refresh().await;
    }

    pub fn grid(&self) -> MonthGrid {
        build_month_grid(
            self.cursor.displayed,
            self.state.date,
            &appointment_dates(&self.month_appointments),
            &self.schedule,
            self.today(),
        )
    }

    pub async fn click_day(&mut self, cell: &DayCell) -> bool {
        let previous = self.cursor.selected;
        if !self.cursor.click(cell) {
            return false;
        }
        if self.select_date(cell.date).await {
            return true;
        }
        self.cursor.selected = previous;
        false
    }

    pub async fn select_date(&mut self, date: NaiveDate) -> bool {
        if !self.open || self.state.phase == BookingPhase::Submitting {
            return false;
        }
        if is_past_date(date, (self.clock)())
            || !offers_slots(&self.schedule, date, self.state.duration, self.policy.overnight)
        {
            return false;
        }

        self.load_day(date).await;
        let slots = self.compute_slots(date, self.state.duration);
        self.cursor.selected = Some(date);
        if YearMonth::of(date) != self.cursor.displayed {
            self.cursor.displayed = YearMonth::of(date);
            self.refresh().await;
        }
        self.dispatch(BookingEvent::DateChosen { date, slots });
        true
    }

    pub fn change_duration(&mut self, duration: SlotDuration) {
        let slots = match self.state.date {
            Some(date) => self.compute_slots(date, duration),
            None => vec![],
        };
        self.dispatch(BookingEvent::DurationChanged { duration, slots });
    }

    pub fn select_slot(&mut self, slot: CandidateSlot) -> bool {
        self.dispatch(BookingEvent::SlotChosen(slot));
        self.state.slot == Some(slot)
    }

    pub fn edit_form(&mut self, edit: FormEdit) {
        self.dispatch(BookingEvent::FormEdited(edit));
    }

    async fn load_day(&mut self, date: NaiveDate) {
        let booked = self.appointments.booked_slots(&self.advisor_id, date).await;
        let listed = self.appointments.list(&self.advisor_id, date, date).await;
        match (booked, listed) {
            (Ok(booked), Ok(appointments)) => {
                self.day = DaySnapshot {
                    date: Some(date),
                    booked,
                    appointments,
                };
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(advisor_id = %self.advisor_id, %date, error = %e, "failed to load bookings for day");
                self.day = DaySnapshot {
                    date: Some(date),
                    ..DaySnapshot::default()
                };
                self.dispatch(BookingEvent::Noticed(e));
            }
        }
    }

    fn compute_slots(&self, date: NaiveDate, duration: SlotDuration) -> Vec<SlotView> {
        let (booked, appointments): (&[BookedSlot], &[Appointment]) = if self.day.date == Some(date) {
            (&self.day.booked, &self.day.appointments)
        } else {
            (&[], &[])
        };
        let day = DayBookings::new(date, booked, appointments)
            .excluding(self.state.editing.as_ref().map(|e| e.id.as_str()));
        slots_for_day(&self.schedule, duration, self.policy.overnight, &day, (self.clock)())
    }

    fn validate(&self) -> Result<AppointmentRequest, BookingError> {
        let state = &self.state;
        let pipeline = state
            .form
            .pipeline
            .clone()
            .or_else(|| self.policy.default_pipeline.clone());

        let mut missing = vec![];
        if state.date.is_none() {
            missing.push(BookingField::Date);
        }
        if state.slot.is_none() {
            missing.push(BookingField::Slot);
        }
        if !state.form.contact.as_ref().is_some_and(ContactChoice::is_complete) {
            missing.push(BookingField::Contact);
        }
        if !pipeline.as_ref().is_some_and(PipelineChoice::is_complete) {
            missing.push(BookingField::Pipeline);
        }

        match (state.date, state.slot, state.form.contact.clone(), pipeline) {
            (Some(date), Some(slot), Some(contact), Some(pipeline)) if missing.is_empty() => {
                if matches!(pipeline, PipelineChoice::New { .. }) && !self.policy.allow_new_pipeline {
                    return Err(BookingError::Invalid(
                        "new pipelines can only be created from the admin dialog".to_string(),
                    ));
                }
                Ok(AppointmentRequest {
                    advisor_id: self.advisor_id.clone(),
                    date,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                    status: state
                        .editing
                        .as_ref()
                        .map(|e| e.status)
                        .unwrap_or(AppointmentStatus::Pending),
                    contact,
                    pipeline,
                    description: state.form.description.clone().filter(|d| !d.trim().is_empty()),
                    color: state.form.color.clone(),
                })
            }
            _ => Err(BookingError::Validation { missing }),
        }
    }

    // Validates and enters `Submitting`. Only one ticket can be outstanding.
    pub fn begin_submit(&mut self) -> Result<SubmitTicket, BookingError> {
        if !self.open {
            return Err(BookingError::Invalid("booking dialog is closed".to_string()));
        }
        if self.state.phase == BookingPhase::Submitting {
            return Err(BookingError::Invalid("a booking is already being submitted".to_string()));
        }

        let request = match self.validate() {
            Ok(r) => r,
            Err(e) => {
                self.dispatch(BookingEvent::Noticed(e.clone()));
                return Err(e);
            }
        };

        self.dispatch(BookingEvent::SubmitStarted);
        tracing::info!(
            advisor_id = %self.advisor_id,
            date = %request.date,
            start = %request.start_time,
            editing = self.state.editing.is_some(),
            "submitting booking"
        );
        Ok(SubmitTicket {
            session: self.session,
            target: self.state.editing.as_ref().map(|e| e.id.clone()),
            request,
        })
    }

    // Applies a submission result; `None` when the dialog it belonged to is gone.
    pub async fn finish_submit(&mut self, outcome: SubmitOutcome) -> Option<Result<Appointment, BookingError>> {
        if !self.open || outcome.session != self.session {
            tracing::debug!(advisor_id = %self.advisor_id, "ignoring result of a closed booking dialog");
            return None;
        }

        match &outcome.result {
            Ok(appointment) => {
                tracing::info!(id = %appointment.id, advisor_id = %self.advisor_id, "booking saved");
                self.dispatch(BookingEvent::SubmitSucceeded);
                self.refresh().await;
                self.open = false;
                self.day = DaySnapshot::default();
            }
            Err(BookingError::Conflict) => {
                tracing::warn!(advisor_id = %self.advisor_id, "selected slot was taken before submit");
                self.dispatch(BookingEvent::SubmitFailed(BookingError::Conflict));
                if let Some(date) = self.state.date {
                    self.load_day(date).await;
                    let slots = self.compute_slots(date, self.state.duration);
                    self.dispatch(BookingEvent::SlotInvalidated { slots });
                }
                self.refresh().await;
            }
            Err(e) => {
                tracing::warn!(advisor_id = %self.advisor_id, error = %e, "booking submission failed");
                self.dispatch(BookingEvent::SubmitFailed(e.clone()));
                self.dispatch(BookingEvent::Recovered);
            }
        }
        Some(outcome.result)
    }

    pub async fn submit(&mut self) -> Result<Appointment, BookingError> {
        let ticket = self.begin_submit()?;
        let repo = self.appointment_repository();
        let outcome = ticket.send(repo.as_ref()).await;
        self.finish_submit(outcome)
            .await
            .unwrap_or_else(|| Err(BookingError::Invalid("booking dialog was closed".to_string())))
    }
}
