use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::{AppointmentRepository, RepoResult, ScheduleRepository};
use crate::errors::BookingError;
use crate::models::{AdvisorSchedule, Appointment, AppointmentRequest, BookedSlot};

// Collaborator reached over the platform's REST API.
pub struct RemoteRepository {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

fn network_err(e: reqwest::Error) -> BookingError {
    BookingError::Network(e.to_string())
}

impl RemoteRepository {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    // Each segment is percent-encoded on its own, so an id cannot reach a
    // different endpoint.
    fn url(&self, segments: &[&str]) -> RepoResult<Url> {
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(BookingError::Invalid(format!("invalid path parameter: {bad:?}")));
        }
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| BookingError::Network(format!("invalid remote API url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| BookingError::Network("remote API url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        if self.token.is_empty() {
            req
        } else {
            req.bearer_auth(&self.token)
        }
    }

    async fn send(&self, req: RequestBuilder) -> RepoResult<Response> {
        let resp = self.authed(req).send().await.map_err(network_err)?;
        match resp.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(resp),
            StatusCode::CONFLICT => Err(BookingError::Conflict),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let body = resp.text().await.unwrap_or_default();
                Err(BookingError::Invalid(body))
            }
            s => Err(BookingError::Network(format!("remote API returned {s}"))),
        }
    }

    async fn json<T: DeserializeOwned>(resp: Response) -> RepoResult<T> {
        resp.json::<T>().await.map_err(network_err)
    }

    // Maps 404 to `None`.
    async fn optional<T: DeserializeOwned>(resp: Response) -> RepoResult<Option<T>> {
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::json(resp).await.map(Some)
    }

    async fn required<T: DeserializeOwned>(resp: Response, what: &str) -> RepoResult<T> {
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BookingError::Invalid(format!("{what} not found")));
        }
        Self::json(resp).await
    }
}

#[async_trait]
impl ScheduleRepository for RemoteRepository {
    async fn get_schedule(&self, advisor_id: &str) -> RepoResult<Option<AdvisorSchedule>> {
        let req = self.client.get(self.url(&["advisors", advisor_id, "schedule"])?);
        Self::optional(self.send(req).await?).await
    }

    async fn update_schedule(&self, advisor_id: &str, schedule: &AdvisorSchedule) -> RepoResult<()> {
        let req = self
            .client
            .put(self.url(&["advisors", advisor_id, "schedule"])?)
            .json(schedule);
        let resp = self.send(req).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BookingError::MissingSchedule(advisor_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentRepository for RemoteRepository {
    async fn list(&self, advisor_id: &str, from: NaiveDate, to: NaiveDate) -> RepoResult<Vec<Appointment>> {
        let req = self
            .client
            .get(self.url(&["advisors", advisor_id, "appointments"])?)
            .query(&[("from", from.to_string()), ("to", to.to_string())]);
        Ok(Self::optional(self.send(req).await?).await?.unwrap_or_default())
    }

    async fn booked_slots(&self, advisor_id: &str, date: NaiveDate) -> RepoResult<Vec<BookedSlot>> {
        let req = self
            .client
            .get(self.url(&["advisors", advisor_id, "booked-slots"])?)
            .query(&[("date", date.to_string())]);
        Ok(Self::optional(self.send(req).await?).await?.unwrap_or_default())
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Appointment>> {
        let req = self.client.get(self.url(&["appointments", id])?);
        Self::optional(self.send(req).await?).await
    }

    async fn create(&self, request: &AppointmentRequest) -> RepoResult<Appointment> {
        let req = self.client.post(self.url(&["appointments"])?).json(request);
        Self::required(self.send(req).await?, "advisor").await
    }

    async fn update(&self, id: &str, request: &AppointmentRequest) -> RepoResult<Appointment> {
        let req = self
            .client
            .put(self.url(&["appointments", id])?)
            .json(request);
        Self::required(self.send(req).await?, "appointment").await
    }

    async fn delete(&self, id: &str) -> RepoResult<bool> {
        let req = self.client.delete(self.url(&["appointments", id])?);
        let resp = self.send(req).await?;
        Ok(resp.status() != StatusCode::NOT_FOUND)
    }
}
