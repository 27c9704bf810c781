//! Typed client for the daemon's HTTP API.

pub mod types;

use anyhow::{Result, bail};

use types::{
    AlarmState, CreateAlarmRequest, CreateAlarmResponse, ErrorResponse, RingingState,
    StatusResponse,
};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8082";

pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_owned())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn list_alarms(&self) -> Result<Vec<AlarmState>> {
        let alarms = self
            .http
            .get(format!("{}/api/alarms", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(alarms)
    }

    pub async fn create_alarm(&self, request: &CreateAlarmRequest) -> Result<CreateAlarmResponse> {
        let response = self
            .http
            .post(format!("{}/api/alarms", self.base_url))
            .json(request)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::BAD_REQUEST {
            let err: ErrorResponse = response.json().await?;
            bail!("server rejected alarm: {}", err.error);
        }
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn delete_alarm(&self, id: &str) -> Result<bool> {
        let status: StatusResponse = self
            .http
            .delete(format!("{}/api/alarms/{id}", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(status.success)
    }

    pub async fn toggle_alarm(&self, id: &str) -> Result<bool> {
        let status: StatusResponse = self
            .http
            .put(format!("{}/api/alarms/{id}/toggle", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(status.success)
    }

    pub async fn stop(&self) -> Result<()> {
        self.http
            .post(format!("{}/api/alarms/stop", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn ringing(&self) -> Result<RingingState> {
        let state = self
            .http
            .get(format!("{}/api/alarms/ringing", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(state)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
