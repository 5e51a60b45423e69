//! `FormstackApi`: a `FormstackClient` wired to a `Transport`.
//!
//! Every method builds (and so validates) first, then performs exactly one
//! `Transport::execute` call, then decodes. Nothing is retried.

use tracing::debug;

use crate::args::Arguments;
use crate::client::{decode_reply, ApiResponse, FormstackClient, Reply};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, Transport};
use crate::transport::UreqTransport;
use crate::types::{
    DeleteResult, Field, FormDetail, FormList, FormSummary, Submission, SubmissionMeta, SubmissionQuery,
};

/// Environment variable holding the bearer credential for `from_env`.
pub const ACCESS_TOKEN_VAR: &str = "FORMSTACK_ACCESS_TOKEN";

#[derive(Debug, Clone)]
pub struct FormstackApi<T = UreqTransport> {
    client: FormstackClient,
    transport: T,
}

impl FormstackApi<UreqTransport> {
    /// Strict client against the production API over ureq.
    pub fn new(access_token: &str) -> Self {
        Self::with_config(access_token, &ClientConfig::default())
    }

    pub fn with_config(access_token: &str, config: &ClientConfig) -> Self {
        Self::with_transport(
            FormstackClient::with_config(access_token, config),
            UreqTransport::new(config.timeout),
        )
    }

    /// Credential from `FORMSTACK_ACCESS_TOKEN`, everything else from
    /// `ClientConfig::from_env`.
    pub fn from_env() -> Result<Self, ApiError> {
        let token = std::env::var(ACCESS_TOKEN_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::InvalidArgument(format!("{ACCESS_TOKEN_VAR} is not set")))?;
        Ok(Self::with_config(&token, &ClientConfig::from_env()))
    }
}

impl<T: Transport> FormstackApi<T> {
    pub fn with_transport(client: FormstackClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &FormstackClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Generic call against any endpoint. In non-strict mode a failed
    /// exchange comes back as `Ok` with `diagnostic` set.
    pub fn request(&self, endpoint: &str, verb: &str, args: &Arguments) -> Result<ApiResponse, ApiError> {
        let request = self.client.build_request(endpoint, verb, args)?;
        self.send(&request)
    }

    fn send(&self, request: &HttpRequest) -> Result<ApiResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "sending Formstack request");
        match self.transport.execute(request) {
            Ok(response) => self.client.check_response(response),
            Err(err) => self.client.check_transport_failure(err),
        }
    }

    pub fn list_forms(&self, include_folders: bool) -> Result<Reply<FormList>, ApiError> {
        let request = self.client.build_list_forms(include_folders)?;
        self.client.decode_list_forms(&self.send(&request)?)
    }

    pub fn get_form_details(&self, form_id: impl ToString) -> Result<Reply<FormDetail>, ApiError> {
        let request = self.client.build_get_form_details(form_id)?;
        decode_reply(&self.send(&request)?)
    }

    pub fn copy_form(&self, form_id: impl ToString) -> Result<Reply<FormSummary>, ApiError> {
        let request = self.client.build_copy_form(form_id)?;
        decode_reply(&self.send(&request)?)
    }

    pub fn list_submissions(
        &self,
        form_id: impl ToString,
        query: &SubmissionQuery,
    ) -> Result<Reply<Vec<Submission>>, ApiError> {
        let request = self.client.build_list_submissions(form_id, query)?;
        self.client.decode_list_submissions(&self.send(&request)?)
    }

    pub fn submit_form<I, V>(
        &self,
        form_id: impl ToString,
        field_ids: &[I],
        field_values: &[V],
        meta: &SubmissionMeta,
    ) -> Result<Reply<Submission>, ApiError>
    where
        I: ToString,
        V: AsRef<str>,
    {
        let request = self.client.build_submit_form(form_id, field_ids, field_values, meta)?;
        decode_reply(&self.send(&request)?)
    }

    pub fn get_submission_details(
        &self,
        submission_id: impl ToString,
        encryption_password: &str,
    ) -> Result<Reply<Submission>, ApiError> {
        let request = self.client.build_get_submission_details(submission_id, encryption_password)?;
        decode_reply(&self.send(&request)?)
    }

    pub fn edit_submission_data<I, V>(
        &self,
        submission_id: impl ToString,
        field_ids: &[I],
        field_values: &[V],
        meta: &SubmissionMeta,
    ) -> Result<Reply<Submission>, ApiError>
    where
        I: ToString,
        V: AsRef<str>,
    {
        let request = self
            .client
            .build_edit_submission_data(submission_id, field_ids, field_values, meta)?;
        decode_reply(&self.send(&request)?)
    }

    pub fn delete_submission(&self, submission_id: impl ToString) -> Result<Reply<DeleteResult>, ApiError> {
        let request = self.client.build_delete_submission(submission_id)?;
        decode_reply(&self.send(&request)?)
    }

    pub fn list_fields(&self, form_id: impl ToString) -> Result<Reply<Vec<Field>>, ApiError> {
        let request = self.client.build_list_fields(form_id)?;
        decode_reply(&self.send(&request)?)
    }

    pub fn get_field_details(&self, field_id: impl ToString) -> Result<Reply<Field>, ApiError> {
        let request = self.client.build_get_field_details(field_id)?;
        decode_reply(&self.send(&request)?)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::http::{HttpMethod, HttpResponse, TransportError};

    /// Replays canned responses and records every request it sees.
    #[derive(Default)]
    struct FakeTransport {
        responses: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
        seen: RefCell<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        fn replying(status: u16, body: &str) -> Self {
            let fake = Self::default();
            fake.responses.borrow_mut().push_back(Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            }));
            fake
        }

        fn failing(message: &str) -> Self {
            let fake = Self::default();
            fake.responses
                .borrow_mut()
                .push_back(Err(TransportError::new(message)));
            fake
        }

        fn calls(&self) -> usize {
            self.seen.borrow().len()
        }
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::new("no canned response")))
        }
    }

    fn api(transport: FakeTransport, strict: bool) -> FormstackApi<FakeTransport> {
        let config = ClientConfig::default().base_url("https://api.test/v2").strict(strict);
        FormstackApi::with_transport(FormstackClient::with_config("tok", &config), transport)
    }

    #[test]
    fn invalid_input_never_reaches_transport() {
        let api = api(FakeTransport::replying(200, "{}"), true);
        let meta = SubmissionMeta::default();
        assert!(api.request("", "GET", &Arguments::new()).is_err());
        assert!(api.request("form.json", "FAIL", &Arguments::new()).is_err());
        assert!(api.get_form_details("abc").is_err());
        assert!(api.copy_form("x").is_err());
        assert!(api.get_submission_details("x", "").is_err());
        assert!(api.delete_submission("x").is_err());
        assert!(api.submit_form(1, &[1, 2], &["a"], &meta).is_err());
        assert!(api.edit_submission_data(1, &["a"], &["a"], &meta).is_err());
        let query = SubmissionQuery {
            per_page: Some(101),
            ..SubmissionQuery::default()
        };
        assert!(api.list_submissions(1, &query).is_err());
        assert_eq!(api.transport().calls(), 0);
    }

    #[test]
    fn request_makes_exactly_one_call() {
        let api = api(FakeTransport::replying(500, "boom"), true);
        let err = api.request("form.json", "get", &Arguments::new()).unwrap_err();
        assert!(matches!(err, ApiError::RequestFailed { status: 500, .. }));
        assert_eq!(api.transport().calls(), 1);
        let seen = api.transport().seen.borrow();
        assert_eq!(seen[0].method, HttpMethod::Get);
        assert_eq!(seen[0].header("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn borrowed_transport_is_a_transport() {
        let fake = FakeTransport::replying(200, r#"[{"id":"7","label":"Name","type":"name"}]"#);
        let config = ClientConfig::default().base_url("https://api.test/v2");
        let api = FormstackApi::with_transport(FormstackClient::with_config("tok", &config), &fake);
        let fields = api.list_fields(3).unwrap().into_result().unwrap();
        assert_eq!(fields[0].label, "Name");
        assert_eq!(fake.calls(), 1);
    }

    #[test]
    fn strict_404_carries_status() {
        let api = api(FakeTransport::replying(404, r#"{"status":"error","error":"nope"}"#), true);
        let err = api.request("form/1", "GET", &Arguments::new()).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn non_strict_404_returns_diagnostic() {
        let api = api(FakeTransport::replying(404, r#"{"status":"error","error":"nope"}"#), false);
        let resp = api.request("form/1", "GET", &Arguments::new()).unwrap();
        let diagnostic = resp.diagnostic.as_ref().expect("diagnostic");
        assert!(diagnostic.to_string().contains("HTTP Status Code: 404"));
        assert_eq!(resp.json().unwrap()["error"], "nope");
    }

    #[test]
    fn non_strict_transport_failure_is_reported() {
        let lenient = api(FakeTransport::failing("dns lookup failed"), false);
        let reply = lenient.list_forms(false).unwrap();
        assert_eq!(reply.failure().unwrap().error, "Request failed: dns lookup failed");

        let strict = api(FakeTransport::failing("dns lookup failed"), true);
        assert!(matches!(strict.list_forms(false), Err(ApiError::Transport(_))));
    }

    #[test]
    fn list_forms_with_folders_is_keyed_by_folder() {
        let body = r#"{"forms":{"Marketing":[{"id":"1","name":"Signup"}],"Support":[{"id":"2","name":"Ticket"},{"id":"3","name":"Survey"}]}}"#;
        let api = api(FakeTransport::replying(200, body), true);
        let list = api.list_forms(true).unwrap().into_result().unwrap();
        match list {
            FormList::Folders(folders) => {
                assert_eq!(folders.keys().collect::<Vec<_>>(), vec!["Marketing", "Support"]);
                assert_eq!(folders["Support"].len(), 2);
            }
            FormList::Flat(_) => panic!("expected folder mapping"),
        }
        assert_eq!(
            api.transport().seen.borrow()[0].url,
            "https://api.test/v2/form.json?folders=1"
        );
    }

    #[test]
    fn submit_form_decodes_created_submission() {
        let api = api(FakeTransport::replying(201, r#"{"id":"9001","message":"ok"}"#), true);
        let created = api
            .submit_form(12, &[100], &["hello"], &SubmissionMeta::default())
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(created.id, "9001");
        let seen = api.transport().seen.borrow();
        assert_eq!(seen[0].method, HttpMethod::Post);
        assert_eq!(seen[0].body.as_deref(), Some("field_100=hello"));
    }
}
