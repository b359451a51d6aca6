use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message returned when the write body lacks a usable `dateKey`/`isAvailable` pair.
pub const MISSING_FIELDS_MESSAGE: &str = "dateKey and isAvailable required";

/// One row of the `availability` table.
/// `updated_at` is optional because tables created outside of `migrate` may allow NULLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub date_key: String,
    pub is_available: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Date key to flag mapping served by the read endpoint.
pub type AvailabilityMap = BTreeMap<String, bool>;

/// Fold rows into the response mapping. A later row for the same key wins.
pub fn to_availability_map<I>(records: I) -> AvailabilityMap
where
    I: IntoIterator<Item = AvailabilityRecord>,
{
    records
        .into_iter()
        .map(|record| (record.date_key, record.is_available))
        .collect()
}

/// Body of the write endpoint as the client sent it.
/// Both fields are kept as raw JSON so a wrongly typed field is a validation
/// failure rather than a parse failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAvailabilityRequest {
    #[serde(default)]
    pub date_key: Option<Value>,
    #[serde(default)]
    pub is_available: Option<Value>,
}

/// Validated write: the only shape the storage layer accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityUpdate {
    pub date_key: String,
    pub is_available: bool,
}

impl UpdateAvailabilityRequest {
    /// Parse a raw request body.
    /// Only malformed JSON is an error here; valid JSON that is not an object
    /// yields an empty request which then fails `validate`.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// `dateKey` must be a non-empty string and `isAvailable` a JSON boolean.
    pub fn validate(self) -> Result<AvailabilityUpdate, String> {
        let date_key = match self.date_key {
            Some(Value::String(key)) if !key.is_empty() => key,
            _ => return Err(MISSING_FIELDS_MESSAGE.to_string()),
        };

        let is_available = match self.is_available {
            Some(Value::Bool(flag)) => flag,
            _ => return Err(MISSING_FIELDS_MESSAGE.to_string()),
        };

        Ok(AvailabilityUpdate {
            date_key,
            is_available,
        })
    }
}

/// Success body of the write endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAvailabilityResponse {
    pub success: bool,
    pub date_key: String,
    pub is_available: bool,
}

impl From<AvailabilityRecord> for UpdateAvailabilityResponse {
    fn from(record: AvailabilityRecord) -> Self {
        UpdateAvailabilityResponse {
            success: true,
            date_key: record.date_key,
            is_available: record.is_available,
        }
    }
}
