use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use hearth_shared::types::{ConversationId, MessageId, UserId};
use hearth_store::{
    ConversationSummary, ConversationView, Database, Message, PresenceRecord, SeedReport,
    TypingRecord, User, UserProfileInput,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/users", post(upsert_user).get(list_users))
        .route("/users/:user_id", get(get_user))
        .route("/users/:user_id/conversations", get(list_for_user))
        .route("/conversations/direct", post(find_or_create_direct))
        .route("/conversations/group", post(create_group))
        .route("/conversations/:id", get(get_details))
        .route("/conversations/:id/read", post(mark_read))
        .route(
            "/conversations/:id/messages",
            post(send_message).get(list_messages),
        )
        .route("/conversations/:id/typing", post(set_typing).get(list_typing))
        .route("/conversations/:id/typing/clear", post(clear_typing))
        .route("/messages/:id/delete", post(delete_message))
        .route("/messages/:id/reactions", post(toggle_reaction))
        .route("/presence", post(set_online).get(list_presence))
        .route("/demo/seed", post(seed_demo))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run a store operation on the blocking pool while holding the lock.
async fn with_db<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut Database) -> hearth_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(&state.db);
    tokio::task::spawn_blocking(move || {
        let mut guard = db
            .lock()
            .map_err(|e| ApiError::Internal(format!("Lock poisoned: {e}")))?;
        op(&mut *guard).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Store task failed: {e}")))?
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct IdResponse<T> {
    id: T,
}

#[derive(Serialize)]
struct ReactionResponse {
    reacted: bool,
}

#[derive(Deserialize)]
struct UserSearchQuery {
    #[serde(default)]
    search: String,
    exclude: Option<String>,
}

#[derive(Deserialize)]
struct DirectRequest {
    user_a: String,
    user_b: String,
}

#[derive(Deserialize)]
struct GroupRequest {
    member_ids: Vec<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: String,
}

#[derive(Deserialize)]
struct UserBody {
    user_id: String,
}

#[derive(Deserialize)]
struct SendRequest {
    sender_id: String,
    text: String,
}

#[derive(Deserialize)]
struct ReactionRequest {
    user_id: String,
    emoji: String,
}

#[derive(Deserialize)]
struct PresenceRequest {
    user_id: String,
    online: bool,
}

#[derive(Deserialize)]
struct PresenceQuery {
    /// Comma-separated user ids.
    #[serde(default)]
    user_ids: String,
}

#[derive(Deserialize)]
struct SeedRequest {
    current_user_id: String,
    current_name: Option<String>,
}

fn parse_user(raw: &str) -> Result<UserId, ApiError> {
    Ok(UserId::parse(raw)?)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn upsert_user(
    State(state): State<AppState>,
    Json(input): Json<UserProfileInput>,
) -> Result<Json<IdResponse<UserId>>, ApiError> {
    let id = with_db(&state, move |db| db.upsert_user(&input)).await?;
    Ok(Json(IdResponse { id }))
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let exclude = query
        .exclude
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .map(parse_user)
        .transpose()?;
    let users = with_db(&state, move |db| db.list_users(&query.search, exclude.as_ref())).await?;
    Ok(Json(users))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user_id = parse_user(&user_id)?;
    with_db(&state, move |db| db.get_user(&user_id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("User"))
}

async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let user_id = parse_user(&user_id)?;
    let list = with_db(&state, move |db| db.list_for_user(&user_id)).await?;
    Ok(Json(list))
}

async fn find_or_create_direct(
    State(state): State<AppState>,
    Json(req): Json<DirectRequest>,
) -> Result<Json<IdResponse<ConversationId>>, ApiError> {
    let a = parse_user(&req.user_a)?;
    let b = parse_user(&req.user_b)?;
    let id = with_db(&state, move |db| db.find_or_create_direct(&a, &b)).await?;
    Ok(Json(IdResponse { id }))
}

async fn create_group(
    State(state): State<AppState>,
    Json(req): Json<GroupRequest>,
) -> Result<Json<IdResponse<ConversationId>>, ApiError> {
    let members = req
        .member_ids
        .iter()
        .map(|m| parse_user(m))
        .collect::<Result<Vec<_>, _>>()?;
    let id = with_db(&state, move |db| db.create_group(&members, req.name.as_deref())).await?;
    info!(conversation_id = %id, "group created via API");
    Ok(Json(IdResponse { id }))
}

async fn get_details(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ConversationView>, ApiError> {
    let user_id = parse_user(&query.user_id)?;
    with_db(&state, move |db| db.get_details(id, &user_id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Conversation"))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Json(body): Json<UserBody>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_user(&body.user_id)?;
    with_db(&state, move |db| db.mark_read(id, &user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Json(req): Json<SendRequest>,
) -> Result<Json<IdResponse<MessageId>>, ApiError> {
    let sender = parse_user(&req.sender_id)?;
    let message_id = with_db(&state, move |db| db.send(id, &sender, &req.text)).await?;
    Ok(Json(IdResponse { id: message_id }))
}

async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = with_db(&state, move |db| db.list_by_conversation(id)).await?;
    Ok(Json(messages))
}

async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
    Json(body): Json<UserBody>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_user(&body.user_id)?;
    with_db(&state, move |db| db.delete_message(id, &user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_reaction(
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
    Json(req): Json<ReactionRequest>,
) -> Result<Json<ReactionResponse>, ApiError> {
    let user_id = parse_user(&req.user_id)?;
    let reacted = with_db(&state, move |db| db.toggle_reaction(id, &user_id, &req.emoji)).await?;
    Ok(Json(ReactionResponse { reacted }))
}

async fn set_online(
    State(state): State<AppState>,
    Json(req): Json<PresenceRequest>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_user(&req.user_id)?;
    with_db(&state, move |db| db.set_online(&user_id, req.online)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_presence(
    State(state): State<AppState>,
    Query(query): Query<PresenceQuery>,
) -> Result<Json<Vec<PresenceRecord>>, ApiError> {
    let ids = query
        .user_ids
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_user)
        .collect::<Result<Vec<_>, _>>()?;
    let records = with_db(&state, move |db| db.list_presence(&ids)).await?;
    Ok(Json(records))
}

async fn set_typing(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Json(body): Json<UserBody>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_user(&body.user_id)?;
    with_db(&state, move |db| db.set_typing(id, &user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_typing(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Json(body): Json<UserBody>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_user(&body.user_id)?;
    with_db(&state, move |db| db.clear_typing(id, &user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_typing(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
) -> Result<Json<Vec<TypingRecord>>, ApiError> {
    let records = with_db(&state, move |db| db.list_typing(id)).await?;
    Ok(Json(records))
}

async fn seed_demo(
    State(state): State<AppState>,
    Json(req): Json<SeedRequest>,
) -> Result<Json<SeedReport>, ApiError> {
    if !state.config.demo_seed_enabled {
        return Err(ApiError::Forbidden("Demo seeding is disabled".into()));
    }
    let user_id = parse_user(&req.current_user_id)?;
    let report = with_db(&state, move |db| {
        db.seed_demo_data(&user_id, req.current_name.as_deref())
    })
    .await?;
    Ok(Json(report))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
