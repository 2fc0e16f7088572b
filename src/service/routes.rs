//! Axum routes for the forum service.

use std::sync::Arc;

use axum::{
    extract::{Form, Json, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ForumError;
use crate::forum::{AccessToken, ForumService, PostView, ReplyView, TopicView, VoteOutcome};
use crate::store::{ForumStore, PoolStats};
use crate::types::{
    Category, CategoryAccessPrivilege, CategoryFlags, CategoryId, CategorySummary, Post, PostId,
    Registration, Reply, ReplyId, Topic, TopicId, User, UserProfile, VoteTarget,
};

use super::middleware::record_vote;
use super::state::ServiceState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Login form (`application/x-www-form-urlencoded`).
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    /// Login name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// Category creation form.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryForm {
    /// Category name.
    pub name: String,
    /// Category description.
    pub desc: String,
}

/// Topic creation form.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicForm {
    /// Headline.
    pub title: String,
    /// Optional introduction.
    #[serde(default)]
    pub description: Option<String>,
}

/// Post creation form.
#[derive(Debug, Clone, Deserialize)]
pub struct PostForm {
    /// Message body.
    pub content: String,
    /// Optional subject line.
    #[serde(default)]
    pub title: Option<String>,
}

/// Reply creation form.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyForm {
    /// Message body.
    pub content: String,
    /// Reply this one answers; must belong to the same post.
    #[serde(default)]
    pub parent_id: Option<i32>,
}

/// Vote request. `1` up, `-1` down, `0` clears.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoteRequest {
    /// Requested direction.
    pub vote: i64,
}

/// Admin flag update.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdminUpdate {
    /// New admin flag.
    pub admin: bool,
}

/// Privilege override for one user on one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivilegeRequest {
    /// User the override applies to.
    pub username: String,
    /// Allow or deny.
    pub allow: bool,
}

/// Plain acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable text.
    pub message: String,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Whether the store answered a round trip.
    pub database: bool,
    /// Connection pool statistics, when the store pools connections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
}

impl HealthResponse {
    fn new(db_healthy: bool, pool: Option<PoolStats>) -> Self {
        Self {
            status: if db_healthy { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: db_healthy,
            pool,
        }
    }
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always `alive`.
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service can take traffic.
    pub ready: bool,
    /// Whether the store answered.
    pub database: bool,
    /// Reason when not ready.
    pub details: Option<String>,
}

/// Structured error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }
}

/// A [`ForumError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ForumError);

impl From<ForumError> for ApiError {
    fn from(e: ForumError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = if status.is_server_error() {
            tracing::error!(code = err.code(), error = %err, "Request failed");
            ErrorResponse::new(err.code(), "Internal server error")
        } else if let ForumError::InvalidInput(detail) = &err {
            tracing::warn!(code = err.code(), error = %err, "Request error");
            ErrorResponse {
                details: Some(detail.clone()),
                ..ErrorResponse::new(err.code(), "Invalid input")
            }
        } else {
            tracing::warn!(code = err.code(), error = %err, "Request error");
            ErrorResponse::new(err.code(), err.to_string())
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

type ApiResult<T> = Result<T, ApiError>;
type SharedState<S> = State<Arc<ServiceState<S>>>;

// ============================================================================
// Authentication
// ============================================================================

/// Pull the token out of an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ForumError> {
    let not_authenticated = || ForumError::Unauthenticated("Not authenticated".to_string());

    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(not_authenticated)?;

    let (scheme, token) = value.split_once(' ').ok_or_else(not_authenticated)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(not_authenticated());
    }
    Ok(token)
}

async fn current_user<S: ForumStore>(forum: &ForumService<S>, headers: &HeaderMap) -> ApiResult<User> {
    let token = bearer_token(headers)?;
    Ok(forum.authenticate(token).await?)
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn register_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Json(registration): Json<Registration>,
) -> ApiResult<Json<MessageResponse>> {
    state.forum().register(registration).await?;
    Ok(Json(MessageResponse {
        message: "User registered successfully".to_string(),
    }))
}

async fn login_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<AccessToken>> {
    let token = state.forum().login(&form.username, &form.password).await?;
    Ok(Json(token))
}

async fn admin_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    headers: HeaderMap,
) -> ApiResult<Json<UserProfile>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    Ok(Json(forum.admin_profile(&user)?))
}

async fn set_admin_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(username): Path<String>,
    headers: HeaderMap,
    Json(update): Json<AdminUpdate>,
) -> ApiResult<Json<UserProfile>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    Ok(Json(forum.set_admin(&user, &username, update.admin).await?))
}

async fn list_categories_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<CategorySummary>>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    let categories = forum.visible_categories(&user).await?;
    Ok(Json(categories.iter().map(Category::summary).collect()))
}

async fn add_category_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    headers: HeaderMap,
    Form(form): Form<CategoryForm>,
) -> ApiResult<Json<CategorySummary>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    let category = forum.add_category(&user, &form.name, &form.desc).await?;
    Ok(Json(category.summary()))
}

async fn update_category_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(flags): Json<CategoryFlags>,
) -> ApiResult<Json<Category>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    Ok(Json(forum.update_category(&user, CategoryId::new(id), flags).await?))
}

async fn set_privilege_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(request): Json<PrivilegeRequest>,
) -> ApiResult<Json<CategoryAccessPrivilege>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    let privilege = forum
        .set_privilege(&user, CategoryId::new(id), &request.username, request.allow)
        .await?;
    Ok(Json(privilege))
}

async fn clear_privilege_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path((id, username)): Path<(i32, String)>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    forum.clear_privilege(&user, CategoryId::new(id), &username).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_topics_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Topic>>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    Ok(Json(forum.list_topics(&user, CategoryId::new(id)).await?))
}

async fn create_topic_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Form(form): Form<TopicForm>,
) -> ApiResult<Json<Topic>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    let topic = forum
        .create_topic(&user, CategoryId::new(id), &form.title, form.description)
        .await?;
    Ok(Json(topic))
}

async fn topic_posts_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Post>>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    Ok(Json(forum.topic_posts(&user, TopicId::new(id)).await?))
}

async fn view_topic_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> ApiResult<Json<TopicView>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    Ok(Json(forum.view_topic(&user, TopicId::new(id)).await?))
}

async fn add_post_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Form(form): Form<PostForm>,
) -> ApiResult<Json<Post>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    let post = forum
        .add_post(&user, TopicId::new(id), &form.content, form.title)
        .await?;
    Ok(Json(post))
}

async fn view_post_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> ApiResult<Json<PostView>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    Ok(Json(forum.view_post(&user, PostId::new(id)).await?))
}

async fn list_replies_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<ReplyView>>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    Ok(Json(forum.post_replies(&user, PostId::new(id)).await?))
}

async fn add_reply_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Form(form): Form<ReplyForm>,
) -> ApiResult<Json<Reply>> {
    let forum = state.forum();
    let user = current_user(&forum, &headers).await?;
    let reply = forum
        .add_reply(&user, PostId::new(id), form.parent_id.map(ReplyId::new), &form.content)
        .await?;
    Ok(Json(reply))
}

async fn cast_vote<S: ForumStore + 'static>(
    state: &ServiceState<S>,
    headers: &HeaderMap,
    target: VoteTarget,
    request: VoteRequest,
) -> ApiResult<Json<VoteOutcome>> {
    let forum = state.forum();
    let user = current_user(&forum, headers).await?;
    let result = forum.vote(&user, target, request.vote).await;
    record_vote(target.kind(), result.is_ok());
    Ok(Json(result?))
}

async fn vote_topic_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(request): Json<VoteRequest>,
) -> ApiResult<Json<VoteOutcome>> {
    cast_vote(&state, &headers, VoteTarget::Topic(TopicId::new(id)), request).await
}

async fn vote_post_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(request): Json<VoteRequest>,
) -> ApiResult<Json<VoteOutcome>> {
    cast_vote(&state, &headers, VoteTarget::Post(PostId::new(id)), request).await
}

async fn vote_reply_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(request): Json<VoteRequest>,
) -> ApiResult<Json<VoteOutcome>> {
    cast_vote(&state, &headers, VoteTarget::Reply(ReplyId::new(id)), request).await
}

/// Health check endpoint (detailed).
async fn health_handler<S: ForumStore + 'static>(State(state): SharedState<S>) -> Json<HealthResponse> {
    let db_healthy = state.store.is_healthy().await;
    Json(HealthResponse::new(db_healthy, state.store.pool_stats()))
}

/// Liveness check. Does not check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness check. 503 while the store is unreachable.
async fn readiness_handler<S: ForumStore + 'static>(
    State(state): SharedState<S>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.store.is_healthy().await {
        Ok(Json(ReadinessResponse {
            ready: true,
            database: true,
            details: None,
        }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                database: false,
                details: Some("Database connection failed".to_string()),
            }),
        ))
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the forum service.
pub fn create_router<S: ForumStore + 'static>(state: ServiceState<S>) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Accounts
        .route("/auth/register", post(register_handler::<S>))
        .route("/auth/login", post(login_handler::<S>))
        .route("/admin", get(admin_handler::<S>))
        .route("/admin/users/:username", put(set_admin_handler::<S>))
        // Categories
        .route("/categories", get(list_categories_handler::<S>))
        .route("/categories/add", post(add_category_handler::<S>))
        .route("/categories/:id", patch(update_category_handler::<S>))
        .route("/categories/:id/privileges", put(set_privilege_handler::<S>))
        .route(
            "/categories/:id/privileges/:username",
            delete(clear_privilege_handler::<S>),
        )
        .route(
            "/categories/:id/topics",
            get(list_topics_handler::<S>).post(create_topic_handler::<S>),
        )
        // Topics
        .route("/topics/:id", get(topic_posts_handler::<S>))
        .route("/topics/:id/view", get(view_topic_handler::<S>))
        .route("/topics/:id/post", post(add_post_handler::<S>))
        .route("/topics/:id/vote", post(vote_topic_handler::<S>))
        // Posts and replies
        .route("/posts/:id", get(view_post_handler::<S>))
        .route("/posts/:id/replies", get(list_replies_handler::<S>))
        .route("/posts/:id/reply", post(add_reply_handler::<S>))
        .route("/posts/:id/vote", post(vote_post_handler::<S>))
        .route("/replies/:id/vote", post(vote_reply_handler::<S>))
        // Health checks
        .route("/health", get(health_handler::<S>))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler::<S>))
        .with_state(state)
}
