//! In-process mock of the admin backend.
//!
//! It keeps real state (fields renumbered on insert/move/delete, users keyed
//! by id) so the tests exercise the same response shapes the dashboard sees
//! in production. Every handled request is recorded in `hits`.
#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use dashboard::types::{
    Campaign, CrmConfiguration, CrmField, CrmFieldAttrs, FieldType, User, UserAttrs, UserRole,
};
use serde_json::{Value, json};

pub const ADMIN_ID: &str = "admin-1";
pub const SESSION_COOKIE: &str = "sid=abc123";
pub const EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "secret";

#[derive(Debug, Default)]
pub struct BackendState {
    pub campaigns: Vec<Campaign>,
    pub users: Vec<User>,
    pub hits: Vec<&'static str>,
    pub logout_cookie: Option<String>,
    /// Answer the configuration endpoint with a body that is not JSON.
    pub garble_configuration: bool,
    next_id: u32,
}

impl BackendState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn campaign_mut(&mut self, id: &str) -> Option<&mut Campaign> {
        self.campaigns.iter_mut().find(|campaign| campaign.id == id)
    }
}

#[derive(Clone, Default)]
pub struct Backend {
    inner: Arc<Mutex<BackendState>>,
}

impl Backend {
    /// Backend with campaign "Sales" (fields at positions 1 and 2, stored
    /// out of order), an empty "Support" campaign and two users.
    pub fn seeded() -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state();
            state.campaigns = vec![
                Campaign {
                    id: "c-sales".to_string(),
                    campaign_name: "Sales".to_string(),
                    crm_fields: vec![field("f2", "Phone", 2), field("f1", "Name", 1)],
                },
                Campaign {
                    id: "c-support".to_string(),
                    campaign_name: "Support".to_string(),
                    crm_fields: vec![],
                },
            ];
            state.users = vec![user("u1", "Ada"), user("u2", "Grace")];
        }
        backend
    }

    pub fn state(&self) -> MutexGuard<'_, BackendState> {
        self.inner.lock().unwrap()
    }

    pub fn hits(&self, label: &str) -> usize {
        self.state().hits.iter().filter(|hit| **hit == label).count()
    }

    pub fn fields_of(&self, campaign_id: &str) -> Vec<CrmField> {
        let mut state = self.state();
        state
            .campaign_mut(campaign_id)
            .map(|campaign| campaign.crm_fields.clone())
            .unwrap_or_default()
    }

    /// Serves the mock on an ephemeral local port and returns its base url.
    pub async fn spawn(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}

/// Base url of a port nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn field(id: &str, caption: &str, position: u32) -> CrmField {
    CrmField {
        id: id.to_string(),
        caption: caption.to_string(),
        field_type: FieldType::Text,
        required: false,
        read_only: false,
        position,
    }
}

pub fn field_attrs(caption: &str, position: u32) -> CrmFieldAttrs {
    CrmFieldAttrs {
        caption: caption.to_string(),
        field_type: FieldType::Text,
        required: true,
        read_only: false,
        position,
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.to_string(),
        username: name.to_string(),
        role: UserRole::Agent,
        crm_email: format!("{id}@crm.example"),
        crm_password: "crm-secret".to_string(),
        agent_mobile: "5550100".to_string(),
    }
}

pub fn user_attrs(id: &str, name: &str) -> UserAttrs {
    UserAttrs {
        user_id: id.to_string(),
        name: name.to_string(),
        role: UserRole::Agent,
        crm_email: format!("{id}@crm.example"),
        crm_password: "crm-secret".to_string(),
        agent_mobile: "5550100".to_string(),
    }
}

fn router(backend: Backend) -> Router {
    Router::new()
        .route("/auth/signin", post(api_login))
        .route("/post-jwt-login", post(jwt_login))
        .route("/federated/login", post(federated_login))
        .route("/logout", get(logout))
        .route("/crm-configuration", get(crm_configuration))
        .route(
            "/{admin_id}/campaign/{campaign_id}/crm-field/create",
            post(create_field),
        )
        .route(
            "/{admin_id}/campaign/{campaign_id}/crm-field/{field_id}/edit",
            patch(edit_field),
        )
        .route(
            "/{admin_id}/campaign/{campaign_id}/crm-field/{field_id}/delete",
            delete(delete_field),
        )
        .route("/users", get(users))
        .route("/{admin_id}/user/register", post(register_user))
        .route("/{admin_id}/user/{user_id}/edit", patch(edit_user))
        .route("/{admin_id}/user/{user_id}/delete", delete(delete_user))
        .with_state(backend)
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(SESSION_COOKIE))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "not logged in" })),
    )
        .into_response()
}

fn with_session_cookie(body: Value) -> Response {
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/"))],
        Json(body),
    )
        .into_response()
}

fn valid_login(body: &Value) -> bool {
    body["email"] == EMAIL && body["password"] == PASSWORD
}

async fn api_login(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    backend.state().hits.push("login");
    if !valid_login(&body) {
        return Json(json!({ "status": "failure", "message": "Invalid credentials" }))
            .into_response();
    }
    with_session_cookie(json!({
        "status": "success",
        "data": { "email": EMAIL, "username": "admin", "role": "admin" }
    }))
}

async fn jwt_login(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    backend.state().hits.push("login");
    if !valid_login(&body) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "bad credentials" })),
        )
            .into_response();
    }
    with_session_cookie(json!({ "email": EMAIL, "token": "jwt-token" }))
}

async fn federated_login(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    backend.state().hits.push("login");
    if !valid_login(&body) || body["returnSecureToken"] != true {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "INVALID_PASSWORD" })),
        )
            .into_response();
    }
    Json(json!({ "email": EMAIL, "idToken": "federated-token", "localId": "xyz" }))
        .into_response()
}

async fn logout(State(backend): State<Backend>, headers: HeaderMap) -> StatusCode {
    let mut state = backend.state();
    state.hits.push("logout");
    state.logout_cookie = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    StatusCode::OK
}

async fn crm_configuration(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if !has_session(&headers) {
        return unauthorized();
    }
    let mut state = backend.state();
    state.hits.push("crm-configuration");
    if state.garble_configuration {
        return (
            [(header::CONTENT_TYPE, "application/json")],
            "{\"_id\": \"admin-1\", \"campaigns\": [",
        )
            .into_response();
    }
    Json(CrmConfiguration {
        id: ADMIN_ID.to_string(),
        campaigns: state.campaigns.clone(),
    })
    .into_response()
}

fn renumber(fields: &mut [CrmField]) {
    for (index, field) in fields.iter_mut().enumerate() {
        field.position = index as u32 + 1;
    }
}

async fn create_field(
    State(backend): State<Backend>,
    Path((admin_id, campaign_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(attrs): Json<CrmFieldAttrs>,
) -> Response {
    if !has_session(&headers) || admin_id != ADMIN_ID {
        return unauthorized();
    }
    let mut state = backend.state();
    state.hits.push("create-field");
    let id = state.next_id("new-");
    let Some(campaign) = state.campaign_mut(&campaign_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if campaign
        .crm_fields
        .iter()
        .any(|field| field.caption.eq_ignore_ascii_case(&attrs.caption))
    {
        return Json(json!({
            "status": "failure",
            "message": "CRM field with this caption already exists"
        }))
        .into_response();
    }

    let created = CrmField {
        id,
        caption: attrs.caption,
        field_type: attrs.field_type,
        required: attrs.required,
        read_only: attrs.read_only,
        position: attrs.position,
    };
    let count = campaign.crm_fields.len() as u32;
    if attrs.position <= count {
        campaign.crm_fields.sort_by_key(|field| field.position);
        let index = (attrs.position - 1) as usize;
        campaign.crm_fields.insert(index, created);
        renumber(&mut campaign.crm_fields);
        return Json(json!({ "status": "positions-updated", "data": campaign.crm_fields }))
            .into_response();
    }

    campaign.crm_fields.push(created.clone());
    Json(json!({ "status": "success", "data": created })).into_response()
}

async fn edit_field(
    State(backend): State<Backend>,
    Path((admin_id, campaign_id, field_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(attrs): Json<CrmFieldAttrs>,
) -> Response {
    if !has_session(&headers) || admin_id != ADMIN_ID {
        return unauthorized();
    }
    let mut state = backend.state();
    state.hits.push("edit-field");
    let Some(campaign) = state.campaign_mut(&campaign_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if campaign
        .crm_fields
        .iter()
        .any(|field| field.id != field_id && field.caption.eq_ignore_ascii_case(&attrs.caption))
    {
        return Json(json!({
            "status": "duplicate",
            "message": format!("CRM field \"{}\" already exists", attrs.caption)
        }))
        .into_response();
    }

    campaign.crm_fields.sort_by_key(|field| field.position);
    let Some(index) = campaign.crm_fields.iter().position(|field| field.id == field_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mut edited = campaign.crm_fields.remove(index);
    edited.caption = attrs.caption;
    edited.field_type = attrs.field_type;
    edited.required = attrs.required;
    edited.read_only = attrs.read_only;
    let target = (attrs.position as usize)
        .saturating_sub(1)
        .min(campaign.crm_fields.len());
    campaign.crm_fields.insert(target, edited);
    renumber(&mut campaign.crm_fields);

    Json(json!({ "status": "success", "data": campaign.crm_fields })).into_response()
}

async fn delete_field(
    State(backend): State<Backend>,
    Path((admin_id, campaign_id, field_id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    if !has_session(&headers) || admin_id != ADMIN_ID {
        return unauthorized();
    }
    let mut state = backend.state();
    state.hits.push("delete-field");
    let Some(campaign) = state.campaign_mut(&campaign_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    campaign.crm_fields.sort_by_key(|field| field.position);
    campaign.crm_fields.retain(|field| field.id != field_id);
    renumber(&mut campaign.crm_fields);
    Json(json!({ "data": campaign.crm_fields })).into_response()
}

async fn users(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if !has_session(&headers) {
        return unauthorized();
    }
    let mut state = backend.state();
    state.hits.push("users");
    Json(json!({ "id": ADMIN_ID, "users": state.users })).into_response()
}

fn user_from_attrs(attrs: UserAttrs) -> User {
    User {
        id: attrs.user_id,
        username: attrs.name,
        role: attrs.role,
        crm_email: attrs.crm_email,
        crm_password: attrs.crm_password,
        agent_mobile: attrs.agent_mobile,
    }
}

async fn register_user(
    State(backend): State<Backend>,
    Path(admin_id): Path<String>,
    headers: HeaderMap,
    Json(attrs): Json<UserAttrs>,
) -> Response {
    if !has_session(&headers) || admin_id != ADMIN_ID {
        return unauthorized();
    }
    let mut state = backend.state();
    state.hits.push("register-user");
    if state.users.iter().any(|user| user.id == attrs.user_id) {
        return Json(json!({
            "status": "failure",
            "message": "User with this id is already registered"
        }))
        .into_response();
    }
    let created = user_from_attrs(attrs);
    state.users.push(created.clone());
    Json(json!({ "status": "success", "data": created })).into_response()
}

async fn edit_user(
    State(backend): State<Backend>,
    Path((admin_id, user_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(attrs): Json<UserAttrs>,
) -> Response {
    if !has_session(&headers) || admin_id != ADMIN_ID {
        return unauthorized();
    }
    let mut state = backend.state();
    state.hits.push("edit-user");
    let updated = user_from_attrs(attrs);
    let Some(existing) = state.users.iter_mut().find(|user| user.id == user_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    *existing = updated.clone();
    Json(json!({ "data": updated })).into_response()
}

async fn delete_user(
    State(backend): State<Backend>,
    Path((admin_id, user_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !has_session(&headers) || admin_id != ADMIN_ID {
        return unauthorized();
    }
    let mut state = backend.state();
    state.hits.push("delete-user");
    state.users.retain(|user| user.id != user_id);
    StatusCode::OK.into_response()
}
