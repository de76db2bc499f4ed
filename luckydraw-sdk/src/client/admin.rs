//! Admin API client.
//!
//! Every request carries the plaintext admin secret in the
//! `LuckyDraw-Admin-Authorization` header.

use reqwest::{Client, RequestBuilder};
use url::Url;
use uuid::Uuid;

use super::{ClientError, parse_response};
use crate::objects::admin::{
    ActivateEventRequest, CloseResponse, DrawResponse, EventDetailResponse, EventResponse,
    ListEventsQuery, TriggerResponse,
};
use crate::signature::ADMIN_AUTH_HEADER;

#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    admin_secret: String,
}

impl AdminClient {
    /// * `base_url` – root URL of the lucky draw server.
    /// * `admin_secret` – the plaintext admin secret.
    pub fn new(base_url: Url, admin_secret: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            admin_secret: admin_secret.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /admin/events`
    pub async fn activate_event(
        &self,
        request: &ActivateEventRequest,
    ) -> Result<EventResponse, ClientError> {
        let url = self.base_url.join("/admin/events")?;
        let resp = self.authorized(self.http.post(url)).json(request).send().await?;
        parse_response(resp).await
    }

    /// `GET /admin/events`
    pub async fn list_events(
        &self,
        query: &ListEventsQuery,
    ) -> Result<Vec<EventResponse>, ClientError> {
        let url = self.base_url.join("/admin/events")?;
        let resp = self.authorized(self.http.get(url)).query(query).send().await?;
        parse_response(resp).await
    }

    /// `GET /admin/events/{event_id}`
    pub async fn show_event(&self, event_id: Uuid) -> Result<EventDetailResponse, ClientError> {
        let url = self.base_url.join(&format!("/admin/events/{event_id}"))?;
        let resp = self.authorized(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// `POST /admin/events/{event_id}/draw`
    pub async fn draw_event(&self, event_id: Uuid) -> Result<DrawResponse, ClientError> {
        let url = self.base_url.join(&format!("/admin/events/{event_id}/draw"))?;
        let resp = self.authorized(self.http.post(url)).send().await?;
        parse_response(resp).await
    }

    /// `POST /admin/events/{event_id}/close`
    pub async fn close_event(&self, event_id: Uuid) -> Result<CloseResponse, ClientError> {
        let url = self.base_url.join(&format!("/admin/events/{event_id}/close"))?;
        let resp = self.authorized(self.http.post(url)).send().await?;
        parse_response(resp).await
    }

    /// `GET /admin/triggers`
    pub async fn show_triggers(&self) -> Result<Vec<TriggerResponse>, ClientError> {
        let url = self.base_url.join("/admin/triggers")?;
        let resp = self.authorized(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(ADMIN_AUTH_HEADER, &self.admin_secret)
    }
}
