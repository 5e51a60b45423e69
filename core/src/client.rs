//! Stateless request builder and response parser for the Formstack v2 API.
//!
//! # Design
//! `FormstackClient` holds the base URL, the bearer credential and the
//! strictness flag, and never touches the network. Each operation is split
//! into a `build_*` method that validates arguments and produces an
//! `HttpRequest`, and a `parse_*` method that consumes the `HttpResponse`.
//! All validation happens in `build_*`, so a rejected call never reaches a
//! transport. `FormstackApi` pairs the two with a `Transport`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::args::Arguments;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, TransportError};
use crate::types::{
    DeleteResult, ErrorResponse, Field, FormDetail, FormList, FormSummary, Submission, SubmissionMeta,
    SubmissionQuery,
};
use crate::validate;

/// Synchronous, stateless client for the Formstack v2 API.
#[derive(Clone)]
pub struct FormstackClient {
    base_url: String,
    access_token: String,
    strict: bool,
}

// The credential stays out of debug output and therefore out of logs.
impl fmt::Debug for FormstackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormstackClient")
            .field("base_url", &self.base_url)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

/// What the server sent back, after strictness has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    /// Present only in non-strict mode, when the exchange failed.
    pub diagnostic: Option<Diagnostic>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.diagnostic.is_none()
    }

    /// Decode the raw body as untyped JSON.
    pub fn json(&self) -> Result<Value, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }
}

/// Report produced instead of an error when the client is not strict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// HTTP status, or 0 when the transport never got one.
    pub status: u16,
    pub transport_error: Option<String>,
    pub body: String,
}

impl Diagnostic {
    fn as_error_response(&self) -> ErrorResponse {
        let error = match &self.transport_error {
            Some(msg) => format!("Request failed: {msg}"),
            None => format!("Request failed with HTTP status {}", self.status),
        };
        ErrorResponse {
            status: "error".to_string(),
            error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Server Response: {}\n\nHTTP Status Code: {}\n\nTransport Error: {}",
            self.body,
            self.status,
            self.transport_error.as_deref().unwrap_or("none")
        )
    }
}

/// Decoded body of a convenience call: the expected record, or the error
/// shape the service uses to report semantic failures.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Success(T),
    Failure(ErrorResponse),
}

impl<T> Reply<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Reply::Success(v) => Some(v),
            Reply::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ErrorResponse> {
        match self {
            Reply::Success(_) => None,
            Reply::Failure(e) => Some(e),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        match self {
            Reply::Success(v) => Reply::Success(f(v)),
            Reply::Failure(e) => Reply::Failure(e),
        }
    }

    /// Turn a service failure into `ApiError::Service`.
    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            Reply::Success(v) => Ok(v),
            Reply::Failure(e) => Err(ApiError::Service {
                status: e.status,
                error: e.error,
            }),
        }
    }
}

#[derive(Deserialize)]
struct FormsEnvelope {
    #[serde(default)]
    forms: Value,
}

#[derive(Deserialize)]
struct SubmissionsEnvelope {
    #[serde(default)]
    submissions: Vec<Submission>,
}

impl FormstackClient {
    /// Strict client against the production API.
    pub fn new(access_token: &str) -> Self {
        Self::with_config(access_token, &ClientConfig::default())
    }

    pub fn with_config(access_token: &str, config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            strict: config.strict,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    // -----------------------------------------------------------------------
    // Generic request
    // -----------------------------------------------------------------------

    /// Build a request for any endpoint. `verb` is matched case-insensitively.
    pub fn build_request(&self, endpoint: &str, verb: &str, args: &Arguments) -> Result<HttpRequest, ApiError> {
        let method: HttpMethod = verb.parse()?;
        self.build(endpoint, method, args)
    }

    fn build(&self, endpoint: &str, method: HttpMethod, args: &Arguments) -> Result<HttpRequest, ApiError> {
        let endpoint = endpoint.trim().trim_start_matches('/');
        if endpoint.is_empty() {
            return Err(ApiError::invalid("You must include an endpoint to request"));
        }

        let mut url = format!("{}/{}", self.base_url, endpoint);
        let mut headers = vec![(
            "Authorization".to_string(),
            format!("Bearer {}", self.access_token),
        )];
        let mut body = None;

        if !args.is_empty() {
            let encoded = args.encode();
            if method == HttpMethod::Get {
                url.push(if url.contains('?') { '&' } else { '?' });
                url.push_str(&encoded);
            } else {
                headers.push((
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ));
                body = Some(encoded);
            }
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Apply the strictness rule to a completed exchange.
    pub fn check_response(&self, response: HttpResponse) -> Result<ApiResponse, ApiError> {
        debug!(status = response.status, "received Formstack response");
        if response.is_success() {
            return Ok(ApiResponse {
                status: response.status,
                body: response.body,
                diagnostic: None,
            });
        }
        if self.strict {
            return Err(ApiError::RequestFailed {
                status: response.status,
                body: response.body,
            });
        }
        let diagnostic = Diagnostic {
            status: response.status,
            transport_error: None,
            body: response.body.clone(),
        };
        warn!(status = diagnostic.status, body = %diagnostic.body, "Formstack request failed");
        Ok(ApiResponse {
            status: response.status,
            body: response.body,
            diagnostic: Some(diagnostic),
        })
    }

    /// Apply the strictness rule to an exchange that produced no status.
    pub fn check_transport_failure(&self, err: TransportError) -> Result<ApiResponse, ApiError> {
        if self.strict {
            return Err(ApiError::Transport(err.message));
        }
        warn!(error = %err, "Formstack request failed before a response arrived");
        Ok(ApiResponse {
            status: 0,
            body: String::new(),
            diagnostic: Some(Diagnostic {
                status: 0,
                transport_error: Some(err.message),
                body: String::new(),
            }),
        })
    }

    // -----------------------------------------------------------------------
    // Forms
    // -----------------------------------------------------------------------

    pub fn build_list_forms(&self, include_folders: bool) -> Result<HttpRequest, ApiError> {
        let args = Arguments::new().with("folders", include_folders);
        self.build("form.json", HttpMethod::Get, &args)
    }

    pub fn parse_list_forms(&self, response: HttpResponse) -> Result<Reply<FormList>, ApiError> {
        self.decode_list_forms(&self.check_response(response)?)
    }

    pub(crate) fn decode_list_forms(&self, response: &ApiResponse) -> Result<Reply<FormList>, ApiError> {
        decode_with(response, |value| {
            let forms = serde_json::from_value::<FormsEnvelope>(value)?.forms;
            if forms.is_object() {
                let folders: BTreeMap<String, Vec<FormSummary>> = serde_json::from_value(forms)?;
                Ok(FormList::Folders(folders))
            } else if forms.is_null() {
                Ok(FormList::Flat(Vec::new()))
            } else {
                Ok(FormList::Flat(serde_json::from_value(forms)?))
            }
        })
    }

    pub fn build_get_form_details(&self, form_id: impl ToString) -> Result<HttpRequest, ApiError> {
        let form_id = validate::numeric_id("form id", form_id)?;
        self.build(&format!("form/{form_id}"), HttpMethod::Get, &Arguments::new())
    }

    pub fn parse_get_form_details(&self, response: HttpResponse) -> Result<Reply<FormDetail>, ApiError> {
        decode_reply(&self.check_response(response)?)
    }

    pub fn build_copy_form(&self, form_id: impl ToString) -> Result<HttpRequest, ApiError> {
        let form_id = validate::numeric_id("form id", form_id)?;
        self.build(&format!("form/{form_id}/copy"), HttpMethod::Post, &Arguments::new())
    }

    pub fn parse_copy_form(&self, response: HttpResponse) -> Result<Reply<FormSummary>, ApiError> {
        decode_reply(&self.check_response(response)?)
    }

    // -----------------------------------------------------------------------
    // Submissions
    // -----------------------------------------------------------------------

    pub fn build_list_submissions(
        &self,
        form_id: impl ToString,
        query: &SubmissionQuery,
    ) -> Result<HttpRequest, ApiError> {
        let form_id = validate::numeric_id("form id", form_id)?;
        let search_ids = validate::numeric_ids("search field id", query.search_field_ids.as_slice())?;
        validate::one_to_one(
            "search field ids",
            "search field values",
            search_ids.len(),
            query.search_field_values.len(),
        )?;
        let min_time = validate::date_time("min_time", &query.min_time)?;
        let max_time = validate::date_time("max_time", &query.max_time)?;
        validate::per_page(query.per_page)?;
        let sort = validate::sort_direction(&query.sort)?;

        let mut args = Arguments::new();
        args.set("encryption_password", &query.encryption_password)
            .set("min_time", min_time)
            .set("max_time", max_time);
        // A pair with an empty value is dropped whole; the rest stay numbered from 0.
        let searches = search_ids
            .iter()
            .zip(&query.search_field_values)
            .filter(|(_, value)| !value.is_empty());
        for (i, (id, value)) in searches.enumerate() {
            args.set(format!("search_field_{i}"), id).set(format!("search_value_{i}"), value);
        }
        args.set("page", query.page.unwrap_or(0))
            .set("per_page", query.per_page.unwrap_or(0))
            .set("sort", sort)
            .set("data", query.data)
            .set("expand_data", query.expand_data);

        self.build(&format!("form/{form_id}/submission.json"), HttpMethod::Get, &args)
    }

    pub fn parse_list_submissions(&self, response: HttpResponse) -> Result<Reply<Vec<Submission>>, ApiError> {
        self.decode_list_submissions(&self.check_response(response)?)
    }

    pub(crate) fn decode_list_submissions(&self, response: &ApiResponse) -> Result<Reply<Vec<Submission>>, ApiError> {
        decode_with(response, |value| {
            let envelope: SubmissionsEnvelope = serde_json::from_value(value)?;
            Ok(envelope.submissions)
        })
    }

    pub fn build_submit_form<I, V>(
        &self,
        form_id: impl ToString,
        field_ids: &[I],
        field_values: &[V],
        meta: &SubmissionMeta,
    ) -> Result<HttpRequest, ApiError>
    where
        I: ToString,
        V: AsRef<str>,
    {
        let form_id = validate::numeric_id("form id", form_id)?;
        let args = submission_arguments(field_ids, field_values, meta)?;
        self.build(&format!("form/{form_id}/submission.json"), HttpMethod::Post, &args)
    }

    pub fn parse_submit_form(&self, response: HttpResponse) -> Result<Reply<Submission>, ApiError> {
        decode_reply(&self.check_response(response)?)
    }

    pub fn build_get_submission_details(
        &self,
        submission_id: impl ToString,
        encryption_password: &str,
    ) -> Result<HttpRequest, ApiError> {
        let submission_id = validate::numeric_id("submission id", submission_id)?;
        let args = Arguments::new().with("encryption_password", encryption_password);
        self.build(&format!("submission/{submission_id}.json"), HttpMethod::Get, &args)
    }

    pub fn parse_get_submission_details(&self, response: HttpResponse) -> Result<Reply<Submission>, ApiError> {
        decode_reply(&self.check_response(response)?)
    }

    pub fn build_edit_submission_data<I, V>(
        &self,
        submission_id: impl ToString,
        field_ids: &[I],
        field_values: &[V],
        meta: &SubmissionMeta,
    ) -> Result<HttpRequest, ApiError>
    where
        I: ToString,
        V: AsRef<str>,
    {
        let submission_id = validate::numeric_id("submission id", submission_id)?;
        let args = submission_arguments(field_ids, field_values, meta)?;
        self.build(&format!("submission/{submission_id}.json"), HttpMethod::Put, &args)
    }

    pub fn parse_edit_submission_data(&self, response: HttpResponse) -> Result<Reply<Submission>, ApiError> {
        decode_reply(&self.check_response(response)?)
    }

    pub fn build_delete_submission(&self, submission_id: impl ToString) -> Result<HttpRequest, ApiError> {
        let submission_id = validate::numeric_id("submission id", submission_id)?;
        self.build(&format!("submission/{submission_id}"), HttpMethod::Delete, &Arguments::new())
    }

    pub fn parse_delete_submission(&self, response: HttpResponse) -> Result<Reply<DeleteResult>, ApiError> {
        decode_reply(&self.check_response(response)?)
    }

    // -----------------------------------------------------------------------
    // Fields
    // -----------------------------------------------------------------------

    pub fn build_list_fields(&self, form_id: impl ToString) -> Result<HttpRequest, ApiError> {
        let form_id = validate::numeric_id("form id", form_id)?;
        self.build(&format!("form/{form_id}/field.json"), HttpMethod::Get, &Arguments::new())
    }

    pub fn parse_list_fields(&self, response: HttpResponse) -> Result<Reply<Vec<Field>>, ApiError> {
        decode_reply(&self.check_response(response)?)
    }

    pub fn build_get_field_details(&self, field_id: impl ToString) -> Result<HttpRequest, ApiError> {
        let field_id = validate::numeric_id("field id", field_id)?;
        self.build(&format!("field/{field_id}.json"), HttpMethod::Get, &Arguments::new())
    }

    pub fn parse_get_field_details(&self, response: HttpResponse) -> Result<Reply<Field>, ApiError> {
        decode_reply(&self.check_response(response)?)
    }
}

/// Shared by submit and edit: paired field arguments plus metadata.
fn submission_arguments<I, V>(field_ids: &[I], field_values: &[V], meta: &SubmissionMeta) -> Result<Arguments, ApiError>
where
    I: ToString,
    V: AsRef<str>,
{
    let ids = validate::numeric_ids("field id", field_ids)?;
    validate::one_to_one("field ids", "field values", ids.len(), field_values.len())?;
    let timestamp = validate::date_time("timestamp", &meta.timestamp)?;

    let mut args = Arguments::new();
    args.set("timestamp", timestamp)
        .set("user_agent", &meta.user_agent)
        .set("remote_addr", &meta.remote_addr)
        .set("payment_status", &meta.payment_status)
        .set("read", meta.read);
    for (id, value) in ids.iter().zip(field_values) {
        args.set(format!("field_{id}"), value.as_ref());
    }
    Ok(args)
}

pub(crate) fn decode_reply<T: DeserializeOwned>(response: &ApiResponse) -> Result<Reply<T>, ApiError> {
    decode_with(response, serde_json::from_value)
}

/// Error-shaped bodies win; a failed exchange without one is reported from
/// its diagnostic; only then is the success shape decoded.
fn decode_with<T>(
    response: &ApiResponse,
    decode: impl FnOnce(Value) -> Result<T, serde_json::Error>,
) -> Result<Reply<T>, ApiError> {
    let value = match serde_json::from_str::<Value>(&response.body) {
        Ok(value) => value,
        Err(e) => {
            return match &response.diagnostic {
                Some(diagnostic) => Ok(Reply::Failure(diagnostic.as_error_response())),
                None => Err(ApiError::DeserializationError(e.to_string())),
            }
        }
    };
    if let Some(error) = error_body(&value) {
        return Ok(Reply::Failure(error));
    }
    if let Some(diagnostic) = &response.diagnostic {
        return Ok(Reply::Failure(diagnostic.as_error_response()));
    }
    decode(value)
        .map(Reply::Success)
        .map_err(|e| ApiError::DeserializationError(e.to_string()))
}

fn error_body(value: &Value) -> Option<ErrorResponse> {
    let obj = value.as_object()?;
    let status = obj.get("status")?.as_str()?;
    let error = obj.get("error")?.as_str()?;
    Some(ErrorResponse {
        status: status.to_string(),
        error: error.to_string(),
    })
}
