use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::coordinator::{BookingCoordinator, SurfacePolicy};
use crate::services::repository::remote::RemoteRepository;
use crate::services::repository::sqlite::SqliteRepository;
use crate::services::repository::{AppointmentRepository, ScheduleRepository};
use crate::services::slots::OvernightPolicy;

pub struct AppState {
    pub config: AppConfig,
    pub schedules: Arc<dyn ScheduleRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
}

impl AppState {
    pub fn with_sqlite(config: AppConfig, conn: Connection) -> Self {
        let repo = Arc::new(SqliteRepository::new(Arc::new(Mutex::new(conn))));
        Self {
            config,
            schedules: repo.clone(),
            appointments: repo,
        }
    }

    pub fn with_remote(config: AppConfig) -> Self {
        let repo = Arc::new(RemoteRepository::new(
            config.remote_api_url.clone(),
            config.remote_api_token.clone(),
        ));
        Self {
            config,
            schedules: repo.clone(),
            appointments: repo,
        }
    }

    pub fn admin_policy(&self) -> SurfacePolicy {
        SurfacePolicy::admin()
    }

    pub fn public_policy(&self) -> SurfacePolicy {
        let mut policy = SurfacePolicy::public(self.config.public_pipeline());
        if self.config.public_overnight_slots {
            policy.overnight = OvernightPolicy::Wrap;
        }
        policy
    }

    pub fn coordinator(&self, advisor_id: &str, policy: SurfacePolicy) -> BookingCoordinator {
        BookingCoordinator::new(
            advisor_id,
            policy,
            Arc::clone(&self.schedules),
            Arc::clone(&self.appointments),
        )
        .with_seed_horizon(self.config.seed_horizon_days)
    }
}
