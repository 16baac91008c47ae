//! Physical location attached to an event.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geocoded point, a free-text address, or both.
///
/// At least one representation must be present. Coordinates are only
/// meaningful as a pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Location {
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        let location = Self {
            label: None,
            address: None,
            latitude: Some(latitude),
            longitude: Some(longitude),
        };
        location.validate()?;
        Ok(location)
    }

    pub fn from_address(address: impl Into<String>) -> Result<Self, ValidationError> {
        let location = Self {
            label: None,
            address: Some(address.into()),
            latitude: None,
            longitude: None,
        };
        location.validate()?;
        Ok(location)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Check the representation invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    return Err(ValidationError::invalid(
                        "latitude",
                        format!("{lat} is outside [-90, 90]"),
                    ));
                }
                if !(-180.0..=180.0).contains(&lng) {
                    return Err(ValidationError::invalid(
                        "longitude",
                        format!("{lng} is outside [-180, 180]"),
                    ));
                }
            }
            (None, None) => {}
            _ => {
                return Err(ValidationError::invalid(
                    "location",
                    "latitude and longitude must be given together",
                ))
            }
        }

        if let Some(address) = &self.address {
            if address.trim().is_empty() {
                return Err(ValidationError::invalid("address", "address cannot be blank"));
            }
        }

        if self.address.is_none() && !self.has_coordinates() {
            return Err(ValidationError::invalid(
                "location",
                "either an address or coordinates are required",
            ));
        }
        Ok(())
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Great-circle distance in kilometres, when both ends are geocoded.
    pub fn haversine_km(&self, other: &Location) -> Option<f64> {
        let (lat1, lng1) = self.coordinates()?;
        let (lat2, lng2) = other.coordinates()?;

        let d_lat = (lat2 - lat1).to_radians();
        let d_lng = (lng2 - lng1).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        Some(EARTH_RADIUS_KM * c)
    }

    /// Short human-readable name: label, first address segment, or coordinates.
    pub fn display_name(&self) -> String {
        if let Some(label) = self.label.as_deref().filter(|l| !l.trim().is_empty()) {
            return label.to_string();
        }
        if let Some(address) = &self.address {
            return address.split(',').next().unwrap_or(address).trim().to_string();
        }
        match self.coordinates() {
            Some((lat, lng)) => format!("GPS: {lat:.4}, {lng:.4}"),
            None => "Unknown location".to_string(),
        }
    }
}
