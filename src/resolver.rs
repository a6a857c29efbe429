//! Address Resolver: turns a free-text address into jurisdiction fields.

use crate::clients::google::models::{AddressComponent, STATUS_OK};
use crate::core::Geocoder;
use crate::error::ResolveError;
use crate::models::{AddressQuery, LocationResult};
use std::sync::Arc;
use tracing::{debug, instrument};

pub const CITY_TAG: &str = "locality";
pub const COUNTY_TAG: &str = "administrative_area_level_2";
pub const TOWNSHIP_TAGS: [&str; 2] = ["sublocality_level_1", "administrative_area_level_3"];
pub const COUNTY_SUFFIX: &str = " County";

/// Removes a trailing `" County"`; any other name comes back unchanged.
pub fn strip_county_suffix(name: &str) -> &str {
    name.strip_suffix(COUNTY_SUFFIX).unwrap_or(name)
}

/// Scans components in list order. A later component carrying a tag overwrites
/// whatever an earlier one set for the same field.
pub fn extract_location(components: &[AddressComponent]) -> LocationResult {
    let mut location = LocationResult::default();
    for component in components {
        if component.has_type(CITY_TAG) {
            location.city = component.long_name.clone();
        }
        if component.has_type(COUNTY_TAG) {
            location.county = strip_county_suffix(&component.long_name).to_string();
        }
        if TOWNSHIP_TAGS.iter().any(|tag| component.has_type(tag)) {
            location.township = component.long_name.clone();
        }
    }
    location
}

#[derive(Debug, Clone)]
pub struct AddressResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl AddressResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    #[instrument(skip(self, query))]
    pub async fn resolve(&self, query: AddressQuery) -> Result<LocationResult, ResolveError> {
        let address = query
            .address
            .filter(|a| !a.is_empty())
            .ok_or(ResolveError::MissingAddress)?;

        let response = self.geocoder.geocode(&address).await?;

        let first = match response.results.first() {
            Some(first) if response.status == STATUS_OK => first,
            _ => {
                return Err(ResolveError::NoMatch {
                    status: response.status,
                    results: response.results.len(),
                    message: response.error_message,
                })
            }
        };

        let location = extract_location(&first.address_components);
        debug!(
            city = %location.city,
            township = %location.township,
            county = %location.county,
            "Resolved address"
        );
        Ok(location)
    }
}
