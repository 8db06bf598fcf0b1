//! Destination DTOs.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! the integration tests catch any drift. Every field is optional because the
//! upstream payload may omit any of them, and an omitted field must never
//! fail the whole collection.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::currency::currency_symbol_for;

/// One travel listing.
///
/// Scalar fields are read leniently: a quoted number still fills `rating` or
/// `fare`, a bare number or boolean still fills a text field, and a quoted
/// `"true"` fills `is_available`. A value that cannot be coerced fails the
/// whole collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DestinationRecord {
    #[serde(default, deserialize_with = "lenient::text")]
    pub property_name: Option<String>,
    /// Free text, most specific place first ("Ubud, Bali, Indonesia").
    #[serde(default, deserialize_with = "lenient::text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub fare: Option<f64>,
    /// e.g. "per night".
    #[serde(default, deserialize_with = "lenient::text")]
    pub fare_unit: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_available: Option<bool>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub hero_image: Option<String>,
    pub detail_images: Option<Vec<Option<String>>>,
    /// ISO 4217 code.
    #[serde(default, deserialize_with = "lenient::text")]
    pub currency: Option<String>,
}

impl DestinationRecord {
    /// First comma-delimited segment of `location`, trimmed.
    pub fn short_location(&self) -> Option<&str> {
        self.location
            .as_deref()
            .and_then(|loc| loc.split(',').next())
            .map(str::trim)
    }

    /// Display symbol for `currency`; empty when the code is absent or unknown.
    pub fn currency_symbol(&self) -> String {
        self.currency
            .as_deref()
            .map(currency_symbol_for)
            .unwrap_or_default()
    }

    /// Gallery URLs in server order, skipping absent entries.
    pub fn gallery(&self) -> Vec<&str> {
        self.detail_images
            .iter()
            .flatten()
            .filter_map(|url| url.as_deref())
            .collect()
    }
}

/// The ordered collection returned by one successful fetch.
///
/// Deserializes straight from a JSON array. Order is the server's; records
/// carry no key, so duplicates are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DestinationResponse(Vec<DestinationRecord>);

impl DestinationResponse {
    pub fn new(records: Vec<DestinationRecord>) -> Self {
        Self(records)
    }

    pub fn into_inner(self) -> Vec<DestinationRecord> {
        self.0
    }
}

impl Deref for DestinationResponse {
    type Target = [DestinationRecord];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<DestinationRecord>> for DestinationResponse {
    fn from(records: Vec<DestinationRecord>) -> Self {
        Self(records)
    }
}

impl IntoIterator for DestinationResponse {
    type Item = DestinationRecord;
    type IntoIter = std::vec::IntoIter<DestinationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a DestinationResponse {
    type Item = &'a DestinationRecord;
    type IntoIter = std::slice::Iter<'a, DestinationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Field deserializers that coerce between JSON scalar types.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Bool(bool),
        Number(serde_json::Number),
        Text(String),
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<Scalar>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Scalar::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("number out of range: {n}"))),
            Some(Scalar::Text(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected a number, got {s:?}"))),
            Some(Scalar::Bool(b)) => Err(D::Error::custom(format!("expected a number, got {b}"))),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }))
    }

    /// Any string other than a case-insensitive `"true"` reads as `false`.
    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        match Option::<Scalar>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Scalar::Bool(b)) => Ok(Some(b)),
            Some(Scalar::Text(s)) => Ok(Some(s.trim().eq_ignore_ascii_case("true"))),
            Some(Scalar::Number(n)) => Err(D::Error::custom(format!("expected a boolean, got {n}"))),
        }
    }
}
