use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("login rejected: {0}")]
    Login(String),
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

/// One row of the device enumeration. Upstream occasionally ships rows with
/// a null id or no serial at all; the resolver skips those.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DeviceList {
    #[serde(default)]
    data: Vec<DeviceEntry>,
}

/// Flat per-device status payload. Every field is optional; a missing field
/// is data, not an error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    #[serde(default, alias = "batteryLevel")]
    pub battery: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default, alias = "motionState")]
    pub motion: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, alias = "last_connection")]
    pub last_connection: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocation {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

/// One upstream location entry. The collection is unordered with respect to
/// time; selection happens downstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPoint {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub location: Option<RawLocation>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub course: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
}

/// Thin client for the upstream tracking API. Holds the base URL and the
/// bearer token for the life of the process; there is no refresh path.
pub struct TrackerApi {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl TrackerApi {
    /// Authenticate once and return a ready client.
    pub async fn login(
        base: &str,
        email: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base = base.trim_end_matches('/').to_string();

        let login: LoginResponse = http
            .post(format!("{base}/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let token = login
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Login("response carried no token".to_string()))?;

        Ok(Self { http, base, token })
    }

    pub async fn list_devices(&self) -> Result<Vec<DeviceEntry>, ApiError> {
        let list: DeviceList = self
            .http
            .get(format!("{}/devices", self.base))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(list.data)
    }

    pub async fn device_status(&self, device_id: i64) -> Result<StatusPayload, ApiError> {
        let payload = self
            .http
            .get(format!("{}/devices/{device_id}/status", self.base))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(payload)
    }

    pub async fn device_points(&self, device_id: i64) -> Result<Vec<RawPoint>, ApiError> {
        let points = self
            .http
            .get(format!("{}/devices/{device_id}/points", self.base))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(points)
    }
}

#[cfg(test)]
impl TrackerApi {
    /// Client aimed at a dead endpoint; every request fails fast.
    pub(crate) fn unreachable() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_millis(200))
                .build()
                .expect("client"),
            base: "http://127.0.0.1:9".to_string(),
            token: String::new(),
        }
    }
}
