//! Typed records for Formstack v2 responses and the options that shape
//! requests.
//!
//! # Design
//! The API is loose about scalar types: ids and counters arrive as either
//! JSON strings or numbers, flags as `"1"`, `1` or `true`. The helpers in
//! `lenient` normalize those so the records can use plain Rust types.
//! Form details keep whatever we do not model in `extra`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One form as returned by `form.json` and `form/{id}/copy`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormSummary {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub views: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub submissions: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub submissions_unread: Option<u64>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub data_url: Option<String>,
    #[serde(default)]
    pub summary_url: Option<String>,
    #[serde(default)]
    pub rss_url: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub encrypted: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub inactive: bool,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub folder: Option<String>,
}

/// Result of `list_forms`: flat, or grouped by folder name.
#[derive(Debug, Clone, PartialEq)]
pub enum FormList {
    Flat(Vec<FormSummary>),
    Folders(BTreeMap<String, Vec<FormSummary>>),
}

impl FormList {
    /// Total number of forms regardless of grouping.
    pub fn form_count(&self) -> usize {
        match self {
            FormList::Flat(forms) => forms.len(),
            FormList::Folders(folders) => folders.values().map(Vec::len).sum(),
        }
    }

    pub fn into_flat(self) -> Vec<FormSummary> {
        match self {
            FormList::Flat(forms) => forms,
            FormList::Folders(folders) => folders.into_values().flatten().collect(),
        }
    }
}

/// A form field definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Field {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub required: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub hidden: bool,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub sort: Option<u64>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub options: Option<Value>,
}

/// Full form schema from `form/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormDetail {
    #[serde(flatten)]
    pub summary: FormSummary,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub javascript: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    /// Settings and anything else not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One field value inside a submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubmissionData {
    #[serde(deserialize_with = "lenient::string")]
    pub field: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
}

/// A submission, as listed, fetched, created or edited.
///
/// Create and edit responses only carry a subset of these fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub form: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub remote_addr: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub latitude: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub longitude: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub read: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient::submission_data")]
    pub data: Vec<SubmissionData>,
}

/// Body of `DELETE submission/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeleteResult {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub success: bool,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
}

/// Failure body the service returns, sometimes with a 2xx status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}

/// Optional submission metadata for `submit_form` and `edit_submission_data`.
///
/// Empty strings and `read == false` are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionMeta {
    pub timestamp: String,
    pub user_agent: String,
    pub remote_addr: String,
    pub payment_status: String,
    pub read: bool,
}

/// Filters and paging for `list_submissions`.
///
/// Empty strings, `false` and `page == Some(0)` mean "not provided".
/// `per_page` is checked against 1..=100 whenever it is `Some`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionQuery {
    pub encryption_password: String,
    pub min_time: String,
    pub max_time: String,
    pub search_field_ids: Vec<String>,
    pub search_field_values: Vec<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort: String,
    pub data: bool,
    pub expand_data: bool,
}

impl SubmissionQuery {
    pub fn search(mut self, field_id: impl ToString, value: impl Into<String>) -> Self {
        self.search_field_ids.push(field_id.to_string());
        self.search_field_values.push(value.into());
        self
    }
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::SubmissionData;

    fn scalar_to_string(v: Value) -> Option<String> {
        match v {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(if b { "1" } else { "0" }.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(scalar_to_string(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar_to_string(Value::deserialize(d)?).filter(|s| !s.is_empty()))
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !matches!(s.as_str(), "" | "0" | "false"),
            _ => false,
        })
    }

    /// Accepts the array form and the object-keyed-by-field-id form.
    pub fn submission_data<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<SubmissionData>, D::Error> {
        let entries = match Value::deserialize(d)? {
            Value::Array(items) => items,
            Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
            _ => Vec::new(),
        };
        entries
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(serde::de::Error::custom))
            .collect()
    }
}
