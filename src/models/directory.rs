//! HR directory response models.
//!
//! Typed payloads returned by [`crate::external::HrDirectoryApi`]. Dates are
//! kept as the raw strings the directory sends; the sync stage parses them
//! and reports malformed values as mapping errors.

use serde::{Deserialize, Serialize};

/// One row of the directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Individual id.
    pub id: String,
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Active flag.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Personal details for one individual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    /// Individual id.
    pub id: String,
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Date of birth, `YYYY-MM-DD`.
    #[serde(default)]
    pub dob: Option<String>,
}

/// Income block of an employment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Income {
    /// Pay unit, e.g. "yearly".
    pub unit: String,
    /// Amount in cents.
    pub amount: i64,
    /// ISO currency code.
    #[serde(default)]
    pub currency: Option<String>,
}

/// Employment details for one individual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employment {
    /// Individual id this record belongs to.
    pub individual_id: String,
    /// Employment status, e.g. "active".
    #[serde(default)]
    pub employment_status: Option<String>,
    /// Employment type, e.g. "employee".
    #[serde(default)]
    pub employment_type: Option<String>,
    /// Start date, `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<String>,
    /// End date, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: Option<String>,
    /// Most recent rehire, `YYYY-MM-DD`.
    #[serde(default)]
    pub latest_rehire_date: Option<String>,
    /// Active flag.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Current income.
    #[serde(default)]
    pub income: Option<Income>,
}

/// One entry of a batched individual lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualResponse {
    /// The requested id.
    pub individual_id: String,
    /// The payload; absent when the directory had no data.
    pub body: Option<Individual>,
}

/// One entry of a batched employment lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentResponse {
    /// The requested id.
    pub individual_id: String,
    /// The payload; absent when the directory had no data.
    pub body: Option<Employment>,
}
