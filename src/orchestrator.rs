//! Client Orchestrator: drives one submission against the two API routes.
//!
//! Resolve the address, then immediately stream the permit answer, publishing
//! the whole display state to an observer after every received chunk.

use crate::error::ClientError;
use crate::models::{AddressQuery, LocationResult, PermitInfoState, PermitQuery};
use crate::streaming::stream_deltas;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

pub const LOCATION_PATH: &str = "/api/get-location";
pub const PERMIT_PATH: &str = "/api/get-permit-info";

const FALLBACK_ERROR: &str = "Something went wrong";

/// Result of one submission. `state` holds whatever was displayed when the
/// submission stopped; a failure mid-stream keeps the partial answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub state: Option<PermitInfoState>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PermitClient {
    base_url: String,
    http: Client,
}

impl PermitClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http: Client::new() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    #[instrument(skip(self, address))]
    pub async fn get_location(&self, address: &str) -> Result<LocationResult, ClientError> {
        let resp = self
            .http
            .post(self.url(LOCATION_PATH))
            .json(&AddressQuery::new(address))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    /// Streams the permit answer for `location` into `state.permit_info`.
    ///
    /// After each chunk the accumulated text replaces `permit_info` and
    /// `on_update` sees the full state.
    #[instrument(skip(self, location, state, on_update))]
    pub async fn stream_permit_info<F>(
        &self,
        location: &LocationResult,
        state: &mut PermitInfoState,
        mut on_update: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&PermitInfoState),
    {
        let resp = self
            .http
            .post(self.url(PERMIT_PATH))
            .json(&PermitQuery::from(location))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let mut deltas = Box::pin(stream_deltas(resp.bytes_stream()));
        let mut result = String::new();
        while let Some(fragment) = deltas.next().await {
            result.push_str(&fragment?);
            state.permit_info = result.clone();
            on_update(state);
        }
        debug!(answer_len = result.len(), "Permit answer complete");
        Ok(())
    }

    /// Runs a whole submission. Errors are reported in the outcome as the
    /// string the user sees, never distinguished by kind.
    pub async fn submit<F>(&self, address: &str, mut on_update: F) -> SubmitOutcome
    where
        F: FnMut(&PermitInfoState),
    {
        let location = match self.get_location(address).await {
            Ok(location) => location,
            Err(err) => {
                warn!(error = %err, "Location lookup failed");
                return SubmitOutcome { state: None, error: Some(err.to_string()) };
            }
        };

        let mut state = PermitInfoState::from(location.clone());
        on_update(&state);

        let error = match self.stream_permit_info(&location, &mut state, &mut on_update).await {
            Ok(()) => None,
            Err(err) => {
                warn!(error = %err, "Permit stream failed");
                Some(err.to_string())
            }
        };
        SubmitOutcome { state: Some(state), error }
    }
}

async fn api_error(resp: reqwest::Response) -> ClientError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
    }

    let status = resp.status();
    let message = resp
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| FALLBACK_ERROR.to_string());
    debug!(status = %status, error = %message, "Request rejected");
    ClientError::Api(message)
}
