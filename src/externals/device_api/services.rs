use futures::{future::BoxFuture, FutureExt};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    StatusCode, Url,
};
use thiserror::Error;
use tracing::{debug, trace};

use crate::models::{
    command_payload::CommandPayload,
    sensor_reading::{SensorReading, SensorReadingError, TelemetryResponse},
    target::Target,
};

/// Path of the telemetry endpoint.
pub const TELEMETRY_ENDPOINT: &str = "/api/data";

/// Sent with every request so the tunnel in front of the device does not
/// answer with its browser warning page.
pub const TUNNEL_WARNING_HEADER: &str = "ngrok-skip-browser-warning";

/// This service separates talking to the device's HTTP control API from the
/// poller and dispatcher logic, which makes both easier to unit test.
pub trait DeviceApiService: Send + Sync {
    /// Fetch the latest telemetry and convert it into a `SensorReading`.
    /// No timeout is applied here; the caller bounds the wait.
    fn fetch_telemetry(&self) -> BoxFuture<'_, Result<SensorReading, ApiError>>;

    /// Send a command to one display. Succeeds only on a 2xx response.
    fn send_command(
        &self,
        target: Target,
        payload: CommandPayload,
    ) -> BoxFuture<'_, Result<(), ApiError>>;
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, TLS...).
    #[error("Request to the device failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The device answered with a non-2xx status.
    #[error("Device answered with status {0}.")]
    UnexpectedStatus(u16),

    /// The telemetry body was not the expected JSON object.
    #[error("Failed to decode telemetry body: {0}")]
    MalformedTelemetry(#[from] serde_json::Error),

    /// The telemetry body decoded but the distance could not be used.
    #[error("Failed to interpret telemetry: {0}")]
    InvalidReading(#[from] SensorReadingError),
}

/// `DeviceApiService` backed by `reqwest`.
pub struct DeviceApiServiceHttp {
    client: reqwest::Client,
    base_url: Url,
}

impl DeviceApiServiceHttp {
    pub fn new(base_url: Url) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(TUNNEL_WARNING_HEADER),
            HeaderValue::from_static("true"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL for an API path.
    pub fn endpoint(&self, path: &str) -> String {
        endpoint_url(&self.base_url, path)
    }
}

/// Append `path` to `base`, keeping any path prefix the base already has.
pub fn endpoint_url(base: &Url, path: &str) -> String {
    format!("{}{}", base.as_str().trim_end_matches('/'), path)
}

fn check_status(status: StatusCode) -> Result<(), ApiError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::UnexpectedStatus(status.as_u16()))
    }
}

/// Decode a telemetry body into a `SensorReading`.
pub fn decode_telemetry(body: &[u8]) -> Result<SensorReading, ApiError> {
    let response: TelemetryResponse = serde_json::from_slice(body)?;
    Ok(SensorReading::try_from(response)?)
}

impl DeviceApiService for DeviceApiServiceHttp {
    fn fetch_telemetry(&self) -> BoxFuture<'_, Result<SensorReading, ApiError>> {
        async move {
            let url = self.endpoint(TELEMETRY_ENDPOINT);
            trace!("GET {}", url);
            let response = self.client.get(&url).send().await?;
            check_status(response.status())?;

            let body = response.bytes().await?;
            let reading = decode_telemetry(&body)?;
            debug!("Fetched telemetry: {}", reading);
            Ok(reading)
        }
        .boxed()
    }

    fn send_command(
        &self,
        target: Target,
        payload: CommandPayload,
    ) -> BoxFuture<'_, Result<(), ApiError>> {
        async move {
            let url = self.endpoint(target.endpoint());
            trace!("POST {} {}", url, payload);
            let response = self.client.post(&url).json(&payload).send().await?;
            check_status(response.status())?;
            debug!("Command accepted by {}.", target);
            Ok(())
        }
        .boxed()
    }
}
