use std::env;

use crate::models::PipelineChoice;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    // Empty means the local sqlite database is the collaborator.
    pub remote_api_url: String,
    pub remote_api_token: String,
    pub seed_horizon_days: u32,
    pub public_overnight_slots: bool,
    pub public_pipeline_id: String,
    pub public_stage_id: String,
    pub business_name: String,
}

fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "advisorbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            remote_api_url: env::var("REMOTE_API_URL").unwrap_or_default(),
            remote_api_token: env::var("REMOTE_API_TOKEN").unwrap_or_default(),
            seed_horizon_days: env::var("SEED_HORIZON_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            public_overnight_slots: flag("PUBLIC_OVERNIGHT_SLOTS"),
            public_pipeline_id: env::var("PUBLIC_PIPELINE_ID").unwrap_or_default(),
            public_stage_id: env::var("PUBLIC_STAGE_ID").unwrap_or_default(),
            business_name: env::var("BUSINESS_NAME").unwrap_or_else(|_| "Advisory".to_string()),
        }
    }

    pub fn uses_remote_api(&self) -> bool {
        !self.remote_api_url.trim().is_empty()
    }

    // Pipeline assigned to bookings made from the public page.
    pub fn public_pipeline(&self) -> Option<PipelineChoice> {
        if self.public_pipeline_id.is_empty() || self.public_stage_id.is_empty() {
            return None;
        }
        Some(PipelineChoice::Existing {
            pipeline_id: self.public_pipeline_id.clone(),
            stage_id: self.public_stage_id.clone(),
        })
    }
}
