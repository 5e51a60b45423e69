//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, the expected request, a simulated
//! response and the expected outcome. Cases with `expected_error` stop at
//! whichever stage is supposed to fail.

use formstack_core::{
    ApiError, ClientConfig, FormList, FormstackClient, HttpMethod, HttpRequest, HttpResponse, Reply,
    SubmissionMeta, SubmissionQuery,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:3000";

fn client() -> FormstackClient {
    FormstackClient::with_config("vector-token", &ClientConfig::default().base_url(BASE_URL))
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn str_field(v: &Value, key: &str) -> String {
    v[key].as_str().unwrap_or_default().to_string()
}

fn str_list(v: &Value, key: &str) -> Vec<String> {
    v[key]
        .as_array()
        .map(|items| items.iter().map(|i| i.as_str().unwrap().to_string()).collect())
        .unwrap_or_default()
}

fn query_from(v: &Value) -> SubmissionQuery {
    SubmissionQuery {
        encryption_password: str_field(v, "encryption_password"),
        min_time: str_field(v, "min_time"),
        max_time: str_field(v, "max_time"),
        search_field_ids: str_list(v, "search_field_ids"),
        search_field_values: str_list(v, "search_field_values"),
        page: v["page"].as_u64().map(|n| n as u32),
        per_page: v["per_page"].as_u64().map(|n| n as u32),
        sort: str_field(v, "sort"),
        data: v["data"].as_bool().unwrap_or(false),
        expand_data: v["expand_data"].as_bool().unwrap_or(false),
    }
}

fn meta_from(v: &Value) -> SubmissionMeta {
    SubmissionMeta {
        timestamp: str_field(v, "timestamp"),
        user_agent: str_field(v, "user_agent"),
        remote_addr: str_field(v, "remote_addr"),
        payment_status: str_field(v, "payment_status"),
        read: v["read"].as_bool().unwrap_or(false),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: path");
    assert_eq!(req.header("Authorization"), Some("Bearer vector-token"), "{name}: auth");
    assert_eq!(req.body.as_deref(), expected["body"].as_str(), "{name}: body");
}

fn assert_error_kind(name: &str, err: &ApiError, expected: &str) {
    match expected {
        "InvalidArgument" => assert!(matches!(err, ApiError::InvalidArgument(_)), "{name}: got {err:?}"),
        "RequestFailed" => assert!(matches!(err, ApiError::RequestFailed { .. }), "{name}: got {err:?}"),
        other => panic!("{name}: unknown expected_error: {other}"),
    }
}

fn names(forms: &Value) -> Vec<String> {
    forms.as_array().unwrap().iter().map(|n| n.as_str().unwrap().to_string()).collect()
}

// ---------------------------------------------------------------------------
// List forms
// ---------------------------------------------------------------------------

#[test]
fn list_forms_test_vectors() {
    let raw = include_str!("../../test-vectors/list_forms.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();

        // Verify build
        let req = c.build_list_forms(case["include_folders"].as_bool().unwrap()).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        // Verify parse
        let list = match c.parse_list_forms(simulated(case)).unwrap() {
            Reply::Success(list) => list,
            Reply::Failure(e) => panic!("{name}: unexpected failure {e:?}"),
        };
        let expected = &case["expected_forms"];
        match list {
            FormList::Flat(forms) => {
                let got: Vec<String> = forms.into_iter().map(|f| f.name).collect();
                assert_eq!(got, names(&expected["Flat"]), "{name}: flat forms");
            }
            FormList::Folders(folders) => {
                let expected = expected["Folders"].as_object().expect("expected folders");
                assert_eq!(folders.len(), expected.len(), "{name}: folder count");
                for (folder, forms) in folders {
                    let got: Vec<String> = forms.into_iter().map(|f| f.name).collect();
                    assert_eq!(got, names(&expected[&folder]), "{name}: folder {folder}");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// List submissions
// ---------------------------------------------------------------------------

#[test]
fn list_submissions_test_vectors() {
    let raw = include_str!("../../test-vectors/list_submissions.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let form_id = case["form_id"].as_str().unwrap();
        let result = c.build_list_submissions(form_id, &query_from(&case["query"]));

        if let Some(expected_error) = case.get("expected_error") {
            assert_error_kind(name, &result.unwrap_err(), expected_error.as_str().unwrap());
        } else {
            assert_request(name, &result.unwrap(), &case["expected_request"]);
        }
    }
}

// ---------------------------------------------------------------------------
// Submit form
// ---------------------------------------------------------------------------

#[test]
fn submit_form_test_vectors() {
    let raw = include_str!("../../test-vectors/submit_form.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected_error = case.get("expected_error").and_then(Value::as_str);

        // Verify build
        let field_ids = str_list(case, "field_ids");
        let field_values = str_list(case, "field_values");
        let built = c.build_submit_form(
            case["form_id"].as_str().unwrap(),
            field_ids.as_slice(),
            field_values.as_slice(),
            &meta_from(&case["meta"]),
        );
        let req = match (built, expected_error) {
            (Err(err), Some(expected)) => {
                assert_error_kind(name, &err, expected);
                continue;
            }
            (Err(err), None) => panic!("{name}: unexpected build error {err:?}"),
            (Ok(req), _) => req,
        };
        assert_request(name, &req, &case["expected_request"]);

        // Verify parse
        let result = c.parse_submit_form(simulated(case));
        if let Some(expected) = expected_error {
            assert_error_kind(name, &result.unwrap_err(), expected);
        } else if let Some(service_error) = case.get("expected_service_error") {
            let reply = result.unwrap();
            assert_eq!(
                reply.failure().map(|e| e.error.as_str()),
                service_error.as_str(),
                "{name}: service error"
            );
        } else {
            let submission = result.unwrap().into_result().unwrap();
            assert_eq!(submission.id, case["expected_id"].as_str().unwrap(), "{name}: id");
        }
    }
}
