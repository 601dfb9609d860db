use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

/// Bearer token accepted by `/api/me`.
pub const MOCK_TOKEN: &str = "mock-token";

/// Session id handed out by `/api/session`.
pub const SESSION_ID: &str = "abc";

/// Body of the 400 from `/api/latin1`: "café" in Latin-1, not valid UTF-8.
pub const LATIN1_BODY: &[u8] = b"caf\xE9";

/// Length of the JSON string served by `/api/big`, past ureq's 10 MiB default.
pub const BIG_STRING_LEN: usize = 11 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: u64,
    pub title: String,
}

#[derive(Deserialize)]
pub struct NewTodo {
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

/// What `/api/echo` saw of the incoming request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub cookie: Option<String>,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hits {
    pub hits: usize,
}

#[derive(Clone, Default)]
pub struct AppState {
    todos: Arc<RwLock<BTreeMap<u64, Todo>>>,
    next_id: Arc<AtomicU64>,
    hits: Arc<AtomicUsize>,
}

pub fn app() -> Router {
    Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/{id}", get(get_todo).delete(delete_todo))
        .route("/api/me", get(me))
        .route("/api/session", post(open_session))
        .route("/api/echo", any(echo))
        .route("/api/broken", any(broken))
        .route("/api/latin1", get(latin1))
        .route("/api/big", get(big))
        .route("/api/hits", get(hits))
        .with_state(AppState::default())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_todos(State(state): State<AppState>) -> Json<Vec<Todo>> {
    Json(state.todos.read().await.values().cloned().collect())
}

async fn create_todo(
    State(state): State<AppState>,
    Json(input): Json<NewTodo>,
) -> (StatusCode, Json<Todo>) {
    let id = state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    let todo = Todo {
        id,
        title: input.title,
    };
    debug!(id, "created todo");
    state.todos.write().await.insert(id, todo.clone());
    (StatusCode::CREATED, Json(todo))
}

async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Todo>, StatusCode> {
    state
        .todos
        .read()
        .await
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_todo(State(state): State<AppState>, Path(id): Path<u64>) -> StatusCode {
    match state.todos.write().await.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// 401 with an empty body unless the request carries `Bearer MOCK_TOKEN`.
async fn me(headers: HeaderMap) -> Result<Json<User>, StatusCode> {
    let expected = format!("Bearer {MOCK_TOKEN}");
    match header_str(&headers, header::AUTHORIZATION.as_str()) {
        Some(value) if value == expected => Ok(Json(User {
            username: "mock-user".to_string(),
        })),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn open_session() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, format!("sid={SESSION_ID}; Path=/"))],
    )
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Echo> {
    Json(Echo {
        method: method.to_string(),
        content_type: header_str(&headers, header::CONTENT_TYPE.as_str()),
        authorization: header_str(&headers, header::AUTHORIZATION.as_str()),
        cookie: header_str(&headers, header::COOKIE.as_str()),
        body,
    })
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn latin1() -> (StatusCode, &'static [u8]) {
    (StatusCode::BAD_REQUEST, LATIN1_BODY)
}

async fn big() -> Json<String> {
    Json("x".repeat(BIG_STRING_LEN))
}

async fn hits(State(state): State<AppState>) -> Json<Hits> {
    let hits = state.hits.fetch_add(1, Ordering::SeqCst) + 1;
    Json(Hits { hits })
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
