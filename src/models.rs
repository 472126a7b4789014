// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Waitlist submission records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbound JSON body. Everything is optional at parse time so that a
/// missing phone number becomes a 400 with a specific message rather
/// than a generic parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub ip_country: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Normalized insert payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSubmission {
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub source_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted submission as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub phone_number: String,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub ip_country: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    pub source_hash: String,
    #[serde(deserialize_with = "store_timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// Successful intake response body.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub data: Submission,
}

impl SubmissionRequest {
    /// The phone number, if present and non-empty. Any other value is
    /// taken as-is.
    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref().filter(|p| !p.is_empty())
    }

    /// Build the insert payload. Country codes are uppercased; absent
    /// values stay absent.
    pub fn into_new_submission(
        self,
        source_hash: String,
        created_at: DateTime<Utc>,
    ) -> Option<NewSubmission> {
        let phone_number = self.phone_number.filter(|p| !p.is_empty())?;

        Some(NewSubmission {
            phone_number,
            country_code: self.country_code.map(|c| c.to_uppercase()),
            ip_country: self.ip_country.map(|c| c.to_uppercase()),
            device_id: self.device_id,
            source_hash,
            created_at,
        })
    }
}

impl From<NewSubmission> for Submission {
    fn from(new: NewSubmission) -> Self {
        Self {
            phone_number: new.phone_number,
            country_code: new.country_code,
            ip_country: new.ip_country,
            device_id: new.device_id,
            source_hash: new.source_hash,
            created_at: new.created_at,
        }
    }
}

/// Timestamps read back from the store. A `timestamp` column without a
/// time zone comes back with no offset; those values are taken as UTC.
mod store_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp {raw:?}")))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }
}

impl SubmissionResponse {
    pub fn accepted(data: Submission) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
