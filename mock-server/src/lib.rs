//! In-memory stand-in for the Formstack v2 API.
//!
//! Serves the form, submission and field endpoints the client uses, with
//! Formstack's response shapes: string ids, `{"status":"error"}` bodies on
//! failure, and bearer-token authorization on every route.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;

/// Token the mock accepts unless another is passed to `app_with_token`.
pub const ACCESS_TOKEN: &str = "mock-access-token";

const DEFAULT_TIMESTAMP: &str = "2014-01-01 00:00:00";
const UNFILED_FOLDER: &str = "Unfiled";

#[derive(Clone, Debug)]
pub struct MockField {
    pub id: u64,
    pub label: String,
    pub field_type: String,
    pub required: bool,
}

#[derive(Clone, Debug)]
pub struct MockForm {
    pub id: u64,
    pub name: String,
    pub folder: Option<String>,
    pub fields: Vec<MockField>,
}

#[derive(Clone, Debug)]
pub struct MockSubmission {
    pub id: u64,
    pub form: u64,
    pub timestamp: String,
    pub user_agent: String,
    pub remote_addr: String,
    pub payment_status: String,
    pub read: bool,
    pub data: BTreeMap<u64, String>,
}

#[derive(Debug)]
pub struct Store {
    forms: BTreeMap<u64, MockForm>,
    submissions: BTreeMap<u64, MockSubmission>,
    next_form_id: u64,
    next_submission_id: u64,
}

impl Store {
    /// Three forms, two of them filed in folders.
    pub fn seeded() -> Self {
        let field = |id: u64, label: &str, field_type: &str, required: bool| MockField {
            id,
            label: label.to_string(),
            field_type: field_type.to_string(),
            required,
        };
        let forms = [
            MockForm {
                id: 1001,
                name: "Contact Us".to_string(),
                folder: Some("Sales".to_string()),
                fields: vec![field(2001, "Name", "name", true), field(2002, "Email", "email", true)],
            },
            MockForm {
                id: 1002,
                name: "Feedback".to_string(),
                folder: Some("Support".to_string()),
                fields: vec![field(2003, "Comments", "textarea", false)],
            },
            MockForm {
                id: 1003,
                name: "Newsletter".to_string(),
                folder: None,
                fields: vec![field(2004, "Email", "email", true)],
            },
        ];
        Self {
            forms: forms.into_iter().map(|f| (f.id, f)).collect(),
            submissions: BTreeMap::new(),
            next_form_id: 1100,
            next_submission_id: 5001,
        }
    }

    fn field(&self, id: u64) -> Option<&MockField> {
        self.forms.values().flat_map(|f| f.fields.iter()).find(|f| f.id == id)
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    token: Arc<str>,
}

pub fn app() -> Router {
    app_with_token(ACCESS_TOKEN)
}

pub fn app_with_token(token: &str) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::seeded())),
        token: Arc::from(token),
    };
    Router::new()
        .route("/form.json", get(list_forms))
        .route("/form/{id}", get(get_form))
        .route("/form/{id}/copy", post(copy_form))
        .route("/form/{id}/submission.json", get(list_submissions).post(create_submission))
        .route("/form/{id}/field.json", get(list_fields))
        .route("/field/{file}", get(get_field))
        .route(
            "/submission/{file}",
            get(get_submission).put(update_submission).delete(delete_submission),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "error": message }))).into_response()
}

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.token);
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return error(StatusCode::UNAUTHORIZED, "The access token provided is invalid.");
    }
    next.run(request).await
}

/// `123` or `123.json`; anything else is not a known resource.
fn parse_id(raw: &str) -> Option<u64> {
    raw.strip_suffix(".json").unwrap_or(raw).parse().ok()
}

fn parse_form_body(body: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(body).unwrap_or_default()
}

fn is_set(params: &HashMap<String, String>, key: &str) -> bool {
    params.get(key).is_some_and(|v| v == "1" || v == "true")
}

fn form_summary(form: &MockForm, submissions: usize) -> Value {
    json!({
        "id": form.id.to_string(),
        "name": form.name,
        "views": "0",
        "submissions": submissions.to_string(),
        "submissions_unread": "0",
        "created": DEFAULT_TIMESTAMP,
        "updated": DEFAULT_TIMESTAMP,
        "encrypted": false,
        "inactive": false,
        "timezone": "US/Eastern",
        "folder": form.folder.clone().unwrap_or_default(),
        "url": format!("https://example.formstack.com/forms/{}", form.id),
    })
}

fn field_json(field: &MockField) -> Value {
    json!({
        "id": field.id.to_string(),
        "label": field.label,
        "type": field.field_type,
        "required": if field.required { "1" } else { "0" },
        "hidden": "0",
    })
}

fn submission_json(store: &Store, sub: &MockSubmission, with_data: bool) -> Value {
    let mut value = json!({
        "id": sub.id.to_string(),
        "form": sub.form.to_string(),
        "timestamp": sub.timestamp,
        "user_agent": sub.user_agent,
        "remote_addr": sub.remote_addr,
        "payment_status": sub.payment_status,
        "read": if sub.read { "1" } else { "0" },
    });
    if with_data {
        let data: Vec<Value> = sub
            .data
            .iter()
            .map(|(field, v)| {
                json!({
                    "field": field.to_string(),
                    "value": v,
                    "label": store.field(*field).map(|f| f.label.clone()).unwrap_or_default(),
                })
            })
            .collect();
        value["data"] = Value::Array(data);
    }
    value
}

fn submission_count(store: &Store, form: u64) -> usize {
    store.submissions.values().filter(|s| s.form == form).count()
}

async fn list_forms(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    let store = state.db.read().await;
    let summaries = store
        .forms
        .values()
        .map(|f| (f, form_summary(f, submission_count(&store, f.id))));

    if is_set(&params, "folders") {
        let mut folders: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for (form, summary) in summaries {
            let folder = form.folder.clone().unwrap_or_else(|| UNFILED_FOLDER.to_string());
            folders.entry(folder).or_default().push(summary);
        }
        return Json(json!({ "forms": folders, "total": store.forms.len() })).into_response();
    }

    let forms: Vec<Value> = summaries.map(|(_, s)| s).collect();
    Json(json!({ "forms": forms, "total": store.forms.len() })).into_response()
}

async fn get_form(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let store = state.db.read().await;
    let Some(form) = parse_id(&id).and_then(|id| store.forms.get(&id)) else {
        return error(StatusCode::NOT_FOUND, "The form was not found");
    };
    let mut detail = form_summary(form, submission_count(&store, form.id));
    detail["fields"] = Value::Array(form.fields.iter().map(field_json).collect());
    detail["language"] = json!("en");
    detail["submit_button_title"] = json!("Submit Form");
    Json(detail).into_response()
}

async fn copy_form(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut store = state.db.write().await;
    let Some(original) = parse_id(&id).and_then(|id| store.forms.get(&id)).cloned() else {
        return error(StatusCode::NOT_FOUND, "The form was not found");
    };
    let copy = MockForm {
        id: store.next_form_id,
        name: format!("Copy of {}", original.name),
        ..original
    };
    store.next_form_id += 1;
    let body = form_summary(&copy, 0);
    store.forms.insert(copy.id, copy);
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn list_fields(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let store = state.db.read().await;
    let Some(form) = parse_id(&id).and_then(|id| store.forms.get(&id)) else {
        return error(StatusCode::NOT_FOUND, "The form was not found");
    };
    let fields: Vec<Value> = form.fields.iter().map(field_json).collect();
    Json(fields).into_response()
}

async fn get_field(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    let store = state.db.read().await;
    match parse_id(&file).and_then(|id| store.field(id)) {
        Some(field) => Json(field_json(field)).into_response(),
        None => error(StatusCode::NOT_FOUND, "The field was not found"),
    }
}

async fn list_submissions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let store = state.db.read().await;
    let Some(form_id) = parse_id(&id).filter(|id| store.forms.contains_key(id)) else {
        return error(StatusCode::NOT_FOUND, "The form was not found");
    };

    let mut searches = Vec::new();
    for i in 0.. {
        let (Some(field), Some(value)) = (
            params.get(&format!("search_field_{i}")),
            params.get(&format!("search_value_{i}")),
        ) else {
            break;
        };
        let Ok(field) = field.parse::<u64>() else {
            return error(StatusCode::BAD_REQUEST, "Invalid search field");
        };
        searches.push((field, value.clone()));
    }

    let mut matching: Vec<&MockSubmission> = store
        .submissions
        .values()
        .filter(|s| s.form == form_id)
        .filter(|s| searches.iter().all(|(f, v)| s.data.get(f) == Some(v)))
        .collect();
    if params.get("sort").is_some_and(|s| s == "DESC") {
        matching.reverse();
    }

    let total = matching.len();
    let per_page = params
        .get("per_page")
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| (1..=100).contains(n))
        .unwrap_or(25);
    let page = params
        .get("page")
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let with_data = is_set(&params, "data") || is_set(&params, "expand_data");
    let submissions: Vec<Value> = matching
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .map(|s| submission_json(&store, s, with_data))
        .collect();

    Json(json!({
        "submissions": submissions,
        "total": total,
        "pages": total.div_ceil(per_page),
    }))
    .into_response()
}

/// Apply `field_*` and metadata pairs from a form-encoded body.
fn apply_pairs(sub: &mut MockSubmission, pairs: Vec<(String, String)>) {
    for (key, value) in pairs {
        match key.as_str() {
            "timestamp" => sub.timestamp = value,
            "user_agent" => sub.user_agent = value,
            "remote_addr" => sub.remote_addr = value,
            "payment_status" => sub.payment_status = value,
            "read" => sub.read = value == "1",
            other => {
                if let Some(field) = other.strip_prefix("field_").and_then(|f| f.parse().ok()) {
                    sub.data.insert(field, value);
                }
            }
        }
    }
}

async fn create_submission(State(state): State<AppState>, Path(id): Path<String>, body: String) -> Response {
    let mut store = state.db.write().await;
    let Some(form_id) = parse_id(&id).filter(|id| store.forms.contains_key(id)) else {
        return error(StatusCode::NOT_FOUND, "The form was not found");
    };
    let mut sub = MockSubmission {
        id: store.next_submission_id,
        form: form_id,
        timestamp: DEFAULT_TIMESTAMP.to_string(),
        user_agent: String::new(),
        remote_addr: String::new(),
        payment_status: String::new(),
        read: false,
        data: BTreeMap::new(),
    };
    apply_pairs(&mut sub, parse_form_body(&body));
    store.next_submission_id += 1;
    let mut reply = submission_json(&store, &sub, true);
    reply["message"] = json!("Submission created");
    store.submissions.insert(sub.id, sub);
    (StatusCode::CREATED, Json(reply)).into_response()
}

async fn get_submission(
    State(state): State<AppState>,
    Path(file): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let store = state.db.read().await;
    let Some(sub) = parse_id(&file).and_then(|id| store.submissions.get(&id)) else {
        return error(StatusCode::NOT_FOUND, "The submission was not found");
    };
    let mut body = submission_json(&store, sub, true);
    if params.contains_key("encryption_password") {
        body["decrypted"] = json!(true);
    }
    Json(body).into_response()
}

async fn update_submission(State(state): State<AppState>, Path(file): Path<String>, body: String) -> Response {
    let mut store = state.db.write().await;
    let Some(id) = parse_id(&file) else {
        return error(StatusCode::NOT_FOUND, "The submission was not found");
    };
    let Some(sub) = store.submissions.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, "The submission was not found");
    };
    apply_pairs(sub, parse_form_body(&body));
    Json(json!({ "success": "1", "id": id.to_string() })).into_response()
}

async fn delete_submission(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    let mut store = state.db.write().await;
    match parse_id(&file).and_then(|id| store.submissions.remove(&id)) {
        Some(sub) => Json(json!({ "success": "1", "id": sub.id.to_string() })).into_response(),
        None => error(StatusCode::NOT_FOUND, "The submission was not found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_json_suffix() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id("42.json"), Some(42));
        assert_eq!(parse_id("abc.json"), None);
        assert_eq!(parse_id("42.xml"), None);
    }

    #[test]
    fn form_body_parses_pairs_in_order() {
        let pairs = parse_form_body("field_1=Jane+Doe&read=1&field_2=a%40b.c");
        assert_eq!(
            pairs,
            vec![
                ("field_1".to_string(), "Jane Doe".to_string()),
                ("read".to_string(), "1".to_string()),
                ("field_2".to_string(), "a@b.c".to_string()),
            ]
        );
        assert!(parse_form_body("").is_empty());
    }

    #[test]
    fn apply_pairs_sets_metadata_and_fields() {
        let mut sub = MockSubmission {
            id: 1,
            form: 1001,
            timestamp: DEFAULT_TIMESTAMP.to_string(),
            user_agent: String::new(),
            remote_addr: String::new(),
            payment_status: String::new(),
            read: false,
            data: BTreeMap::new(),
        };
        apply_pairs(
            &mut sub,
            vec![
                ("read".to_string(), "1".to_string()),
                ("user_agent".to_string(), "tests".to_string()),
                ("field_2001".to_string(), "Jane".to_string()),
                ("unknown".to_string(), "ignored".to_string()),
            ],
        );
        assert!(sub.read);
        assert_eq!(sub.user_agent, "tests");
        assert_eq!(sub.data.get(&2001).map(String::as_str), Some("Jane"));
        assert_eq!(sub.data.len(), 1);
    }

    #[test]
    fn seeded_store_has_folders_and_fields() {
        let store = Store::seeded();
        assert_eq!(store.forms.len(), 3);
        assert_eq!(store.field(2003).map(|f| f.label.as_str()), Some("Comments"));
        assert!(store.field(9999).is_none());
    }

    #[test]
    fn form_summary_uses_string_ids() {
        let store = Store::seeded();
        let summary = form_summary(&store.forms[&1001], 2);
        assert_eq!(summary["id"], "1001");
        assert_eq!(summary["submissions"], "2");
        assert_eq!(summary["folder"], "Sales");
    }
}
