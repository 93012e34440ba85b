pub mod anthropic;
pub mod classifier;
pub mod composer;
pub mod config;
pub mod db;
pub mod divination;
pub mod error;
pub mod generative;
pub mod identity;
pub mod logging;
pub mod memory;
pub mod openai;
pub mod personality;
pub mod session;
pub mod temporal;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use classifier::Feedback;
use composer::{ChatTurn, Composer, PROMPT_HISTORY};
use config::AppConfig;
use db::{ConversationLog, LogEntry, SqliteConversationLog};
use divination::{DivinationController, DivinationMethod, DivinationParam, DivinationRequest};
use error::StartupError;
use generative::{GenerativeModel, SharedModel};
use memory::{FileMemoryStore, MemoryStore};
use personality::{DEFLECTION, EMPTY_MESSAGE_REPLY, FEEDBACK_PROMPT};
use serde::{Deserialize, Serialize};
use session::{Role, SessionMap};
use std::net::SocketAddr;
use std::sync::Arc;
use temporal::LocaleHints;
use tower_http::cors::CorsLayer;

pub const ADMIN_LOG_LIMIT: usize = 50;
const RETRY_PROMPT: &str = "🌸 Shall we try again?";

// ============ App State ============

/// Everything the handlers share, built once at startup
pub struct AppState {
    pub config: AppConfig,
    pub memory: Arc<dyn MemoryStore>,
    pub log: Arc<dyn ConversationLog>,
    pub composer: Composer,
    pub sessions: SessionMap,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: AppConfig,
        memory: Arc<dyn MemoryStore>,
        log: Arc<dyn ConversationLog>,
        model: Option<SharedModel>,
    ) -> Self {
        let composer = Composer::new(model, config.rng_seed, config.default_utc_offset);
        Self {
            config,
            memory,
            log,
            composer,
            sessions: SessionMap::new(),
        }
    }

    fn model(&self) -> Option<&dyn GenerativeModel> {
        self.composer.model().map(|m| m.as_ref())
    }

    fn divination_controller(&self, user_id: &str) -> DivinationController<'_> {
        DivinationController::new(
            user_id,
            self.memory.as_ref(),
            self.model(),
            self.config.escalation_policy,
        )
    }

    fn record_turn(&self, user_id: &str, user_message: &str, reply: &str) {
        self.sessions.push(user_id, Role::Assistant, reply);
        if let Err(e) = self.log.append(&LogEntry::new(user_id, user_message, reply)) {
            logging::log_error(Some(user_id), &format!("Conversation log write failed: {}", e));
        }
    }
}

// ============ Request / Response Types ============

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub timezone_offset: Option<f64>,
    #[serde(default)]
    pub local_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DivinationBody {
    #[serde(default)]
    pub user_id: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Vec<DivinationParam>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DivinationResponse {
    pub result: String,
    pub method: String,
    pub is_generative: bool,
    pub feedback_prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub cleared: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub generative_available: bool,
    pub provider: Option<String>,
    pub features: Vec<String>,
    pub active_users: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogsResponse {
    pub total_logs: u64,
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub active_users: usize,
    pub users: Vec<String>,
}

// ============ Caller Identity ============

fn caller_origin(connect_info: Option<&ConnectInfo<SocketAddr>>, headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, connect_info) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(ConnectInfo(addr))) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

fn caller_id(
    explicit: Option<&str>,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
) -> String {
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    identity::resolve_user_id(explicit, &caller_origin(connect_info, headers), user_agent)
}

// ============ Handlers ============

async fn chat_handler(
    State(state): State<SharedState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let user_id = caller_id(request.user_id.as_deref(), connect_info.as_ref(), &headers);
    let message = request.message.trim();

    if message.is_empty() {
        return Json(ChatResponse { reply: EMPTY_MESSAGE_REPLY.to_string(), user_id });
    }
    logging::log_chat(Some(&user_id), &format!("User: {}", message));

    let history = state.sessions.recent(&user_id, PROMPT_HISTORY);
    state.sessions.push(&user_id, Role::User, message);

    // "tarot 3,7,18" style messages run the reading directly
    if let Some(mut invocation) = divination::parse_invocation(message) {
        invocation.emotion = Some(classifier::detect_emotion(message).as_str().to_string());
        let outcome = state.divination_controller(&user_id).handle(&invocation).await;
        let reply = format!("{}\n\n{}", outcome.text, FEEDBACK_PROMPT);
        state.record_turn(&user_id, message, &reply);
        return Json(ChatResponse { reply, user_id });
    }

    if let Some(feedback) = classifier::detect_feedback(message) {
        state
            .divination_controller(&user_id)
            .feedback(feedback == Feedback::Accurate);
    }

    let turn = ChatTurn {
        user_id: &user_id,
        message,
        locale: LocaleHints {
            timezone: request.timezone.as_deref(),
            utc_offset: request.timezone_offset,
            local_time: request.local_time.as_deref(),
        },
        history: &history,
        now: Utc::now(),
    };
    let composed = state.composer.compose(state.memory.as_ref(), turn).await;
    logging::log_chat(Some(&user_id), &format!("Nua ({:?}): {}", composed.path, composed.text));

    state.record_turn(&user_id, message, &composed.text);
    Json(ChatResponse { reply: composed.text, user_id })
}

async fn divination_handler(
    State(state): State<SharedState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<DivinationBody>,
) -> Json<DivinationResponse> {
    let user_id = caller_id(body.user_id.as_deref(), connect_info.as_ref(), &headers);

    let Some(method) = DivinationMethod::from_str(&body.method) else {
        logging::log_divination(Some(&user_id), &format!("Unknown method: {}", body.method));
        return Json(DivinationResponse {
            result: DEFLECTION.to_string(),
            method: body.method,
            is_generative: false,
            feedback_prompt: RETRY_PROMPT.to_string(),
        });
    };

    let request = DivinationRequest {
        method,
        params: body.params,
        question: body.question,
        emotion: body.emotion,
    };
    let outcome = state.divination_controller(&user_id).handle(&request).await;

    Json(DivinationResponse {
        result: outcome.text,
        method: method.as_str().to_string(),
        is_generative: outcome.is_generative,
        feedback_prompt: FEEDBACK_PROMPT.to_string(),
    })
}

async fn clear_handler(
    State(state): State<SharedState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<ClearRequest>,
) -> Json<ClearResponse> {
    let user_id = caller_id(body.user_id.as_deref(), connect_info.as_ref(), &headers);
    let cleared = state.sessions.clear(&user_id);
    let message = if cleared { "Conversation cleared" } else { "User not found" };
    Json(ClearResponse { cleared, message: message.to_string() })
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let model = state.composer.model();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "Nua".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        generative_available: model.is_some(),
        provider: model.map(|m| m.name().to_string()),
        features: ["closeness mode 💗", "tarot 🎴", "hexagram ☯️", "color reading 🎲"]
            .iter()
            .map(|f| f.to_string())
            .collect(),
        active_users: state.sessions.user_count(),
    })
}

async fn admin_logs_handler(
    State(state): State<SharedState>,
) -> Result<Json<LogsResponse>, (StatusCode, String)> {
    let internal = |e: error::LogError| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    let total_logs = state.log.count().map_err(internal)?;
    let logs = state.log.recent(ADMIN_LOG_LIMIT).map_err(internal)?;
    Ok(Json(LogsResponse { total_logs, logs }))
}

async fn admin_users_handler(State(state): State<SharedState>) -> Json<UsersResponse> {
    let users = state.sessions.users();
    Json(UsersResponse { active_users: users.len(), users })
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/divination", post(divination_handler))
        .route("/clear", post(clear_handler))
        .route("/health", get(health_handler))
        .route("/admin/logs", get(admin_logs_handler))
        .route("/admin/users", get(admin_users_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============ Run ============

pub async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    let _log_guard = logging::init_logging(config.log_dir.as_deref());

    let model = generative::build_model(&config)?;
    match &model {
        Some(m) => tracing::info!(provider = m.name(), "Generative model ready"),
        None => tracing::warn!("No generative model configured, replies use scripted fallback"),
    }

    let memory = FileMemoryStore::new(config.memory_dir.clone())?;
    let log = SqliteConversationLog::open(&config.log_db_path)?;
    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(config, Arc::new(memory), Arc::new(log), model));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Nua listening");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generative::testing::ScriptedModel;
    use crate::memory::InMemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    struct Harness {
        state: SharedState,
        memory: Arc<InMemoryStore>,
    }

    fn harness(model: Option<Arc<ScriptedModel>>) -> Harness {
        let memory = Arc::new(InMemoryStore::new());
        let log = Arc::new(SqliteConversationLog::open_in_memory().unwrap());
        let config = AppConfig { rng_seed: Some(3), ..AppConfig::default() };
        let state = Arc::new(AppState::new(
            config,
            memory.clone(),
            log,
            model.map(|m| m as SharedModel),
        ));
        Harness { state, memory }
    }

    async fn send<T: DeserializeOwned>(state: &SharedState, request: Request<Body>) -> (StatusCode, T) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("user-agent", "nua-test")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_fallback_mode() {
        let h = harness(None);
        let (status, health): (_, HealthResponse) = send(&h.state, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health.status, "healthy");
        assert!(!health.generative_available);
        assert_eq!(health.provider, None);
    }

    #[tokio::test]
    async fn test_empty_message_gets_quiet_reply() {
        let h = harness(None);
        let (_, reply): (_, ChatResponse) =
            send(&h.state, post_json("/chat", serde_json::json!({"message": "   ", "user_id": "u1"}))).await;
        assert_eq!(reply.reply, EMPTY_MESSAGE_REPLY);
        assert!(h.state.sessions.users().is_empty());
    }

    #[tokio::test]
    async fn test_chat_turn_is_logged_and_listed() {
        let h = harness(Some(Arc::new(ScriptedModel::with_replies(&["The evening air is soft."]))));
        let (_, reply): (_, ChatResponse) =
            send(&h.state, post_json("/chat", serde_json::json!({"message": "hi there", "user_id": "u1"}))).await;
        assert_eq!(reply.reply, "The evening air is soft.");
        assert_eq!(reply.user_id, "u1");

        let (_, logs): (_, LogsResponse) = send(&h.state, get_req("/admin/logs")).await;
        assert_eq!(logs.total_logs, 1);
        assert_eq!(logs.logs[0].user_message, "hi there");
        assert_eq!(logs.logs[0].reply, "The evening air is soft.");

        let (_, users): (_, UsersResponse) = send(&h.state, get_req("/admin/users")).await;
        assert_eq!(users.users, vec!["u1".to_string()]);
        assert_eq!(h.state.sessions.recent("u1", 8).len(), 2);
    }

    #[tokio::test]
    async fn test_derived_user_id_without_explicit_id() {
        let h = harness(None);
        let (_, reply): (_, ChatResponse) =
            send(&h.state, post_json("/chat", serde_json::json!({"message": "hello"}))).await;
        assert_eq!(reply.user_id, identity::derive_user_id("unknown", "nua-test"));
    }

    #[tokio::test]
    async fn test_hexagram_table_reading_over_http() {
        let h = harness(Some(Arc::new(ScriptedModel::new())));
        let body = serde_json::json!({"user_id": "u1", "method": "hexagram", "params": [1, 2]});
        let (_, result): (_, DivinationResponse) = send(&h.state, post_json("/divination", body)).await;

        assert!(!result.is_generative);
        assert_eq!(result.method, "hexagram");
        assert!(result.result.contains("Earth over Heaven, Tai"));
        assert_eq!(result.feedback_prompt, FEEDBACK_PROMPT);
    }

    #[tokio::test]
    async fn test_unknown_method_deflects() {
        let h = harness(None);
        let body = serde_json::json!({"user_id": "u1", "method": "palmistry", "params": [3]});
        let (_, result): (_, DivinationResponse) = send(&h.state, post_json("/divination", body)).await;
        assert_eq!(result.result, DEFLECTION);
        assert_eq!(result.method, "palmistry");
        assert_eq!(result.feedback_prompt, RETRY_PROMPT);
    }

    #[tokio::test]
    async fn test_negative_feedback_in_chat_escalates_next_reading() {
        let model = Arc::new(ScriptedModel::new());
        let h = harness(Some(model.clone()));

        let reading = serde_json::json!({"user_id": "u1", "method": "tarot", "params": [8]});
        let (_, first): (_, DivinationResponse) = send(&h.state, post_json("/divination", reading.clone())).await;
        assert!(!first.is_generative);
        assert!(first.result.starts_with("You drew The Chariot."));

        model.push_reply("That one missed, sorry.");
        let _: (_, ChatResponse) =
            send(&h.state, post_json("/chat", serde_json::json!({"message": "不准", "user_id": "u1"}))).await;
        assert!(h.memory.load("u1").divination.api_triggered);

        model.push_reply("The Chariot rolls on through soft rain.");
        let (_, second): (_, DivinationResponse) = send(&h.state, post_json("/divination", reading)).await;
        assert!(second.is_generative);
        assert_eq!(second.result, "The Chariot rolls on through soft rain.");
    }

    #[tokio::test]
    async fn test_inline_invocation_in_chat() {
        let h = harness(None);
        let (_, reply): (_, ChatResponse) = send(
            &h.state,
            post_json("/chat", serde_json::json!({"message": "tarot 1, 2, 3", "user_id": "u1"})),
        )
        .await;
        assert!(reply.reply.starts_with("Past: The Fool"));
        assert!(reply.reply.ends_with(FEEDBACK_PROMPT));
        assert_eq!(h.memory.load("u1").divination.count, 1);
    }

    #[tokio::test]
    async fn test_menu_reply_for_divination_intent() {
        let h = harness(None);
        let (_, reply): (_, ChatResponse) = send(
            &h.state,
            post_json("/chat", serde_json::json!({"message": "can you do divination?", "user_id": "u1", "local_time": "09:15"})),
        )
        .await;
        assert!(reply.reply.starts_with("☀️ 🔮"));
    }

    #[tokio::test]
    async fn test_clear_history() {
        let h = harness(None);
        let _: (_, ChatResponse) =
            send(&h.state, post_json("/chat", serde_json::json!({"message": "hello", "user_id": "u1"}))).await;

        let (_, cleared): (_, ClearResponse) =
            send(&h.state, post_json("/clear", serde_json::json!({"user_id": "u1"}))).await;
        assert!(cleared.cleared);
        assert!(h.state.sessions.recent("u1", 8).is_empty());

        let (_, missing): (_, ClearResponse) =
            send(&h.state, post_json("/clear", serde_json::json!({"user_id": "ghost"}))).await;
        assert!(!missing.cleared);
    }
}
