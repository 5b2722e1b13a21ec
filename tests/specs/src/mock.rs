// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process mock of the Mastodon-compatible endpoints tootauth talks to.
//!
//! Binds `127.0.0.1:0`, records every request, and serves canned login and
//! consent pages shaped like a GoToSocial instance.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const SESSION_COOKIE: &str = "mock_session=ok";
const OOB: &str = "urn:ietf:wg:oauth:2.0:oob";

/// How the consent step hands back the authorization code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentStyle {
    /// Consent POST answers `302` with the code in `Location`.
    Redirect,
    /// Consent POST answers `200` with `code=...` in the page.
    BodyCode,
    /// The authorize page already shows `code=...`; no consent form.
    InlineCode,
    /// The authorize page has no consent form at all.
    Missing,
    /// The app is already approved: the authorize page redirects straight
    /// to `/oauth/authorize/native?code=...`.
    Approved,
}

/// Knobs for one mock instance.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub app_status: u16,
    /// Replaces the default registration response.
    pub app_body: Option<Value>,
    pub token_status: u16,
    /// Replaces the derived token response.
    pub token_body: Option<Value>,
    pub verify_status: u16,
    /// Replaces the default identity payload.
    pub account_body: Option<Value>,
    /// Whether `/oauth/authorize` needs a signed-in session.
    pub require_login: bool,
    pub username: String,
    pub password: String,
    /// Anti-forgery token rendered into forms and required on submit.
    pub csrf_token: Option<String>,
    pub consent: ConsentStyle,
    pub auth_code: String,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            app_status: 200,
            app_body: None,
            token_status: 200,
            token_body: None,
            verify_status: 200,
            account_body: None,
            require_login: true,
            username: "bot@example.com".to_owned(),
            password: "hunter2".to_owned(),
            csrf_token: Some("csrf-mock-token".to_owned()),
            consent: ConsentStyle::Redirect,
            auth_code: "mock-auth-code".to_owned(),
        }
    }
}

/// One request as seen by the mock.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Form, JSON, or multipart fields flattened to strings.
    pub fields: HashMap<String, String>,
    pub authorization: Option<String>,
}

struct MockState {
    behavior: MockBehavior,
    base_url: String,
    log: Mutex<Vec<RecordedRequest>>,
}

impl MockState {
    async fn record(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        fields: HashMap<String, String>,
    ) {
        let authorization =
            headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_owned);
        self.log.lock().await.push(RecordedRequest {
            method: method.to_string(),
            path: uri.path().to_owned(),
            query: uri.query().map(str::to_owned),
            fields,
            authorization,
        });
    }

    fn csrf_ok(&self, fields: &HashMap<String, String>) -> bool {
        match self.behavior.csrf_token {
            Some(ref expected) => fields.get("authenticity_token") == Some(expected),
            None => true,
        }
    }

    fn account(&self) -> Value {
        if let Some(ref body) = self.behavior.account_body {
            return body.clone();
        }
        json!({
            "id": "01HMOCKACCOUNT",
            "username": "bot",
            "acct": "bot",
            "display_name": "Mock Bot",
            "url": format!("{}/@bot", self.base_url),
            "bot": true,
            "followers_count": 3,
        })
    }
}

/// A running mock instance; the server task stops on drop.
pub struct MockInstance {
    url: String,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockInstance {
    pub async fn start(behavior: MockBehavior) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        let state = Arc::new(MockState {
            behavior,
            base_url: url.clone(),
            log: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/v1/apps", post(register_app))
            .route("/oauth/authorize", get(authorize_page).post(authorize_submit))
            .route("/auth/sign_in", get(sign_in_page).post(sign_in_submit))
            .route("/oauth/token", post(token))
            .route("/api/v1/accounts/verify_credentials", get(verify_credentials))
            .route("/api/v1/statuses", post(post_status))
            .route("/api/v1/statuses/{id}", delete(delete_status))
            .route("/api/v1/statuses/{id}/{action}", post(status_action))
            .route("/api/v1/media", post(upload_media))
            .route("/api/v1/timelines/{kind}", get(timeline))
            .route("/api/v1/notifications", get(notifications))
            .route("/api/v1/accounts/{id}/follow", post(follow))
            .route("/api/v2/search", get(search))
            .with_state(Arc::clone(&state));

        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self { url, state, task })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.log.lock().await.clone()
    }

    /// Number of requests matching `method` and `path`.
    pub async fn count(&self, method: &str, path: &str) -> usize {
        self.state.log.lock().await.iter().filter(|r| r.method == method && r.path == path).count()
    }

    /// The most recent request matching `method` and `path`.
    pub async fn last(&self, method: &str, path: &str) -> Option<RecordedRequest> {
        self.state
            .log
            .lock()
            .await
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .cloned()
    }
}

impl Drop for MockInstance {
    fn drop(&mut self) {
        self.task.abort();
    }
}

type Shared = State<Arc<MockState>>;

fn logged_in(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(';').any(|c| c.trim() == SESSION_COOKIE))
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|t| t.starts_with("tok_"))
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "The access token is invalid" })))
        .into_response()
}

fn csrf_input(state: &MockState) -> String {
    match state.behavior.csrf_token {
        Some(ref token) => {
            format!(r#"<input type="hidden" name="authenticity_token" value="{token}">"#)
        }
        None => String::new(),
    }
}

fn login_page(state: &MockState) -> Html<String> {
    let meta = match state.behavior.csrf_token {
        Some(ref token) => format!(r#"<meta name="csrf-token" content="{token}">"#),
        None => String::new(),
    };
    Html(format!(
        r#"<!DOCTYPE html><html><head><title>Sign in</title>{meta}</head><body>
<h1>Sign in</h1>
<form action="/auth/sign_in" method="POST">
<input type="email" name="username"><input type="password" name="password">
<button type="submit">Sign in</button></form></body></html>"#
    ))
}

async fn register_app(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    s.record(&method, &uri, &headers, form.clone()).await;
    if s.behavior.app_status != 200 {
        return (status(s.behavior.app_status), Json(json!({ "error": "application rejected" })))
            .into_response();
    }
    let body = s.behavior.app_body.clone().unwrap_or_else(|| {
        json!({
            "id": "01HMOCKAPP",
            "name": form.get("client_name").cloned().unwrap_or_default(),
            "website": form.get("website").cloned(),
            "redirect_uri": OOB,
            "client_id": "mock-client-id",
            "client_secret": "mock-client-secret",
        })
    });
    Json(body).into_response()
}

async fn authorize_page(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    s.record(&method, &uri, &headers, query).await;
    if s.behavior.require_login && !logged_in(&headers) {
        return redirect("/auth/sign_in");
    }
    match s.behavior.consent {
        ConsentStyle::InlineCode => Html(format!(
            "<html><body><p>Already approved. Your code: code={}</p></body></html>",
            s.behavior.auth_code
        ))
        .into_response(),
        ConsentStyle::Missing => {
            Html("<html><body><h1>Nothing to see here</h1></body></html>".to_owned())
                .into_response()
        }
        ConsentStyle::Approved => {
            redirect(&format!("/oauth/authorize/native?code={}", s.behavior.auth_code))
        }
        ConsentStyle::Redirect | ConsentStyle::BodyCode => Html(format!(
            r#"<html><body><h1>Authorize mock app?</h1>
<form action="/oauth/authorize" method="POST">{}
<button type="submit">Allow</button></form></body></html>"#,
            csrf_input(&s)
        ))
        .into_response(),
    }
}

async fn authorize_submit(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    s.record(&method, &uri, &headers, form.clone()).await;
    if s.behavior.require_login && !logged_in(&headers) {
        return redirect("/auth/sign_in");
    }
    if !s.csrf_ok(&form) {
        return (StatusCode::FORBIDDEN, "csrf token mismatch").into_response();
    }
    match s.behavior.consent {
        ConsentStyle::Redirect => redirect(&format!("{OOB}?code={}", s.behavior.auth_code)),
        ConsentStyle::BodyCode => Html(format!(
            "<html><body><p>Copy this into your app: code={}</p></body></html>",
            s.behavior.auth_code
        ))
        .into_response(),
        ConsentStyle::InlineCode | ConsentStyle::Missing | ConsentStyle::Approved => {
            (StatusCode::BAD_REQUEST, "unexpected consent submission").into_response()
        }
    }
}

async fn sign_in_page(State(s): Shared, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    s.record(&method, &uri, &headers, HashMap::new()).await;
    login_page(&s).into_response()
}

async fn sign_in_submit(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    s.record(&method, &uri, &headers, form.clone()).await;
    if !s.csrf_ok(&form) {
        return (StatusCode::FORBIDDEN, "csrf token mismatch").into_response();
    }
    let accepted = form.get("username") == Some(&s.behavior.username)
        && form.get("password") == Some(&s.behavior.password);
    if !accepted {
        return login_page(&s).into_response();
    }
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, "/oauth/authorize".to_owned()),
            (header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/; HttpOnly")),
        ],
    )
        .into_response()
}

async fn token(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    s.record(&method, &uri, &headers, form.clone()).await;
    if s.behavior.token_status != 200 {
        return (status(s.behavior.token_status), Json(json!({ "error": "invalid_grant" })))
            .into_response();
    }
    if let Some(ref body) = s.behavior.token_body {
        return Json(body.clone()).into_response();
    }

    let access_token = match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => match form.get("code") {
            Some(code) if !code.is_empty() => format!("tok_{code}"),
            _ => return invalid_grant(),
        },
        Some("password") => {
            let accepted = form.get("username") == Some(&s.behavior.username)
                && form.get("password") == Some(&s.behavior.password);
            if !accepted {
                return invalid_grant();
            }
            format!("tok_pw_{}", s.behavior.username)
        }
        _ => return invalid_grant(),
    };

    Json(json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "scope": form.get("scope").cloned().unwrap_or_else(|| "read".to_owned()),
        "created_at": 1_700_000_000u64,
    }))
    .into_response()
}

fn invalid_grant() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" }))).into_response()
}

async fn verify_credentials(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    s.record(&method, &uri, &headers, HashMap::new()).await;
    if s.behavior.verify_status != 200 {
        return (
            status(s.behavior.verify_status),
            Json(json!({ "error": "The access token is invalid" })),
        )
            .into_response();
    }
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    Json(s.account()).into_response()
}

async fn post_status(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let fields = body
        .as_object()
        .map(|m| m.iter().map(|(k, v)| (k.clone(), flatten(v))).collect())
        .unwrap_or_default();
    s.record(&method, &uri, &headers, fields).await;
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    Json(json!({
        "id": "01HMOCKSTATUS",
        "content": body.get("status").cloned().unwrap_or(Value::Null),
        "visibility": body.get("visibility").cloned().unwrap_or(Value::Null),
        "url": format!("{}/@bot/statuses/01HMOCKSTATUS", s.base_url),
    }))
    .into_response()
}

fn flatten(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn upload_media(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut fields = HashMap::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().unwrap_or_default().to_owned();
                let file_name = field.file_name().map(str::to_owned);
                let text = match field.bytes().await {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(_) => return (StatusCode::BAD_REQUEST, "bad multipart").into_response(),
                };
                fields.insert(name.clone(), text);
                if let Some(file_name) = file_name {
                    fields.insert(format!("{name}.filename"), file_name);
                }
            }
            Ok(None) => break,
            Err(_) => return (StatusCode::BAD_REQUEST, "bad multipart").into_response(),
        }
    }
    s.record(&method, &uri, &headers, fields.clone()).await;
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    Json(json!({
        "id": "01HMOCKMEDIA",
        "type": "image",
        "description": fields.get("description").cloned(),
    }))
    .into_response()
}

async fn timeline(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(kind): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    s.record(&method, &uri, &headers, query.clone()).await;
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    let limit = query.get("limit").and_then(|l| l.parse::<usize>().ok()).unwrap_or(20).min(3);
    let statuses: Vec<Value> = (0..limit)
        .map(|i| json!({ "id": format!("{kind}-{i}"), "content": format!("post {i}") }))
        .collect();
    Json(Value::Array(statuses)).into_response()
}

async fn notifications(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    s.record(&method, &uri, &headers, query).await;
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    Json(json!([{ "id": "n1", "type": "mention" }])).into_response()
}

async fn follow(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    s.record(&method, &uri, &headers, HashMap::new()).await;
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    Json(json!({ "id": id, "following": true })).into_response()
}

async fn search(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    s.record(&method, &uri, &headers, query.clone()).await;
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    let q = query.get("q").cloned().unwrap_or_default();
    Json(json!({
        "accounts": [{ "id": "01HFOUND", "username": q }],
        "statuses": [],
        "hashtags": [],
    }))
    .into_response()
}

async fn status_action(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path((id, action)): Path<(String, String)>,
) -> Response {
    s.record(&method, &uri, &headers, HashMap::new()).await;
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    match action.as_str() {
        "favourite" => Json(json!({ "id": id, "favourited": true })).into_response(),
        "reblog" => Json(json!({ "id": id, "reblogged": true })).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_status(
    State(s): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    s.record(&method, &uri, &headers, HashMap::new()).await;
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    Json(json!({ "id": id, "text": "deleted" })).into_response()
}
