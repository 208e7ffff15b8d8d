use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    AdvisorSchedule, Appointment, AppointmentStatus, BookedSlot, ScheduleMode, WallTime,
    WeekdaySchedule, WeeklySchedule,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

fn now_str() -> String {
    Utc::now().naive_utc().format(TS_FORMAT).to_string()
}

// ── Schedules ──

pub fn get_schedule(conn: &Connection, advisor_id: &str) -> anyhow::Result<Option<AdvisorSchedule>> {
    let mode: Option<String> = conn
        .query_row(
            "SELECT mode FROM advisor_schedules WHERE advisor_id = ?1",
            params![advisor_id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(mode) = mode else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT weekday, start_time, end_time, is_available
         FROM weekday_schedules WHERE advisor_id = ?1",
    )?;
    let rows = stmt.query_map(params![advisor_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, bool>(3)?,
        ))
    })?;

    let mut entries = vec![];
    for row in rows {
        let (weekday, start, end, is_available) = row?;
        entries.push(WeekdaySchedule {
            weekday: weekday
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid weekday in database: {weekday}"))?,
            start: start.as_deref().map(WallTime::parse).transpose()?,
            end: end.as_deref().map(WallTime::parse).transpose()?,
            is_available,
        });
    }

    // A custom mode without a full template degrades to "missing".
    let weekly = if entries.is_empty() {
        None
    } else {
        match WeeklySchedule::new(entries) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(advisor_id, error = %e, "ignoring incomplete weekly schedule");
                None
            }
        }
    };

    Ok(Some(AdvisorSchedule {
        mode: ScheduleMode::parse(&mode),
        weekly,
    }))
}

pub fn save_schedule(conn: &Connection, advisor_id: &str, schedule: &AdvisorSchedule) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO advisor_schedules (advisor_id, mode, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(advisor_id) DO UPDATE SET mode = excluded.mode, updated_at = excluded.updated_at",
        params![advisor_id, schedule.mode.as_str(), now_str()],
    )?;

    if let Some(weekly) = &schedule.weekly {
        tx.execute(
            "DELETE FROM weekday_schedules WHERE advisor_id = ?1",
            params![advisor_id],
        )?;
        for entry in weekly.entries() {
            tx.execute(
                "INSERT INTO weekday_schedules (advisor_id, weekday, start_time, end_time, is_available)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    advisor_id,
                    entry.weekday.to_string().to_lowercase(),
                    entry.start.map(time_str),
                    entry.end.map(time_str),
                    entry.is_available,
                ],
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

// `24:00` must survive storage, so it is not written through `Display`.
fn time_str(t: WallTime) -> String {
    if t == WallTime::END_OF_DAY {
        "24:00".to_string()
    } else {
        t.to_string()
    }
}

// ── Customers & pipelines ──

pub fn find_or_create_customer(
    conn: &Connection,
    email: &str,
    name: Option<&str>,
    phone: Option<&str>,
) -> anyhow::Result<String> {
    let email = email.trim().to_lowercase();
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM customers WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO customers (id, email, name, phone, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, email, name, phone, now_str()],
    )?;
    Ok(id)
}

// Returns (pipeline_id, first_stage_id).
// Runs inside the caller's transaction together with the appointment write.
pub fn create_pipeline(conn: &Connection, name: &str) -> anyhow::Result<(String, String)> {
    let pipeline_id = uuid::Uuid::new_v4().to_string();
    let stage_id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO pipelines (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![pipeline_id, name.trim(), now_str()],
    )?;
    conn.execute(
        "INSERT INTO pipeline_stages (id, pipeline_id, name, position) VALUES (?1, ?2, 'New', 0)",
        params![stage_id, pipeline_id],
    )?;
    Ok((pipeline_id, stage_id))
}

// ── Appointments ──

const APPOINTMENT_COLUMNS: &str = "id, advisor_id, date, start_time, end_time, status, customer_id, pipeline_id, stage_id, description, color, created_at, updated_at";

pub fn create_appointment(conn: &Connection, appt: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO appointments ({APPOINTMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            appt.id,
            appt.advisor_id,
            appt.date.format(DATE_FORMAT).to_string(),
            appt.start_time.to_string(),
            appt.end_time.to_string(),
            appt.status.as_str(),
            appt.customer_id,
            appt.pipeline_id,
            appt.stage_id,
            appt.description,
            appt.color,
            appt.created_at.format(TS_FORMAT).to_string(),
            appt.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn update_appointment(conn: &Connection, appt: &Appointment) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET date = ?1, start_time = ?2, end_time = ?3, status = ?4,
            customer_id = ?5, pipeline_id = ?6, stage_id = ?7, description = ?8, color = ?9,
            updated_at = ?10
         WHERE id = ?11",
        params![
            appt.date.format(DATE_FORMAT).to_string(),
            appt.start_time.to_string(),
            appt.end_time.to_string(),
            appt.status.as_str(),
            appt.customer_id,
            appt.pipeline_id,
            appt.stage_id,
            appt.description,
            appt.color,
            appt.updated_at.format(TS_FORMAT).to_string(),
            appt.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_appointment(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id], |row| Ok(parse_appointment_row(row)))?;
    match rows.next() {
        Some(row) => Ok(Some(row??)),
        None => Ok(None),
    }
}

// All statuses, inclusive range, chronological.
pub fn list_appointments(
    conn: &Connection,
    advisor_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE advisor_id = ?1 AND date >= ?2 AND date <= ?3
         ORDER BY date ASC, start_time ASC"
    ))?;

    let rows = stmt.query_map(
        params![
            advisor_id,
            from.format(DATE_FORMAT).to_string(),
            to.format(DATE_FORMAT).to_string()
        ],
        |row| Ok(parse_appointment_row(row)),
    )?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn get_booked_slots(conn: &Connection, advisor_id: &str, date: NaiveDate) -> anyhow::Result<Vec<BookedSlot>> {
    Ok(list_appointments(conn, advisor_id, date, date)?
        .iter()
        .map(Appointment::booked_slot)
        .collect())
}

pub fn delete_appointment(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let date_str: String = row.get(2)?;
    let start_str: String = row.get(3)?;
    let end_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let created_at_str: String = row.get(11)?;
    let updated_at_str: String = row.get(12)?;

    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TS_FORMAT)
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TS_FORMAT)
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Appointment {
        id: row.get(0)?,
        advisor_id: row.get(1)?,
        date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)?,
        start_time: WallTime::parse(&start_str)?,
        end_time: WallTime::parse(&end_str)?,
        status: AppointmentStatus::parse(&status_str),
        customer_id: row.get(6)?,
        pipeline_id: row.get(7)?,
        stage_id: row.get(8)?,
        description: row.get(9)?,
        color: row.get(10)?,
        created_at,
        updated_at,
    })
}
