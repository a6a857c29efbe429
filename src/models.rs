//! Request-scoped values exchanged between the browser, the two API routes and
//! the orchestrator. Nothing here outlives a single submission.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/get-location`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressQuery {
    #[serde(default)]
    pub address: Option<String>,
}

impl AddressQuery {
    pub fn new(address: impl Into<String>) -> Self {
        Self { address: Some(address.into()) }
    }
}

/// Jurisdiction fields extracted from the first geocoding match.
/// A field is `""` when no component carried its tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationResult {
    pub city: String,
    pub township: String,
    pub county: String,
}

/// Body of `POST /api/get-permit-info`. Interpolated verbatim into the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermitQuery {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub township: Option<String>,
}

impl From<&LocationResult> for PermitQuery {
    fn from(location: &LocationResult) -> Self {
        Self {
            city: Some(location.city.clone()),
            county: Some(location.county.clone()),
            township: Some(location.township.clone()),
        }
    }
}

/// What the result panel shows for the current submission.
///
/// `permit_info` is always the whole answer received so far, never a delta.
/// `permit_website` is a placeholder that no response populates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitInfoState {
    pub city: String,
    pub township: String,
    pub county: String,
    pub permit_website: String,
    pub permit_info: String,
}

impl From<LocationResult> for PermitInfoState {
    fn from(location: LocationResult) -> Self {
        Self {
            city: location.city,
            township: location.township,
            county: location.county,
            permit_website: String::new(),
            permit_info: String::new(),
        }
    }
}
