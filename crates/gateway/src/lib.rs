//! HTTP API gateway for Steward.
//!
//! Exposes a liveness root, a health check, the tool catalog, and the
//! agent execution endpoint. Each execute request runs a fresh
//! plan–act–reflect loop over shared, read-only collaborators.
//!
//! Built on Axum.

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use steward_agent::{AgentResponse, AutonomousAgent, LoopSettings};
use steward_config::AppConfig;
use steward_core::provider::{Provider, ToolDefinition};
use steward_core::{PersonaCatalog, ToolRegistry};

const API_KEY_HEADER: &str = "x-api-key";
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub provider: Arc<dyn Provider>,
    pub model: String,
    pub tools: Arc<ToolRegistry>,
    pub personas: Arc<PersonaCatalog>,
    pub settings: LoopSettings,

    /// When set, `/api/v1` requests must carry it in `X-API-Key`
    pub api_key: Option<String>,
}

impl GatewayState {
    /// A fresh agent for one request.
    fn agent(&self) -> AutonomousAgent {
        AutonomousAgent::new(self.provider.clone(), &self.model, self.tools.clone())
            .with_personas(self.personas.clone())
            .with_settings(self.settings.clone())
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the router with all gateway routes.
///
/// Layers applied:
/// - API key check on `/api/v1` routes (when configured)
/// - CORS restricted to `allowed_origins`
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/agent/execute", post(execute_handler))
        .route("/tools", get(tools_handler))
        .layer(middleware::from_fn_with_state(state.clone(), api_key_middleware));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(API_KEY_HEADER),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// Builds the provider, tool registry, and persona catalog once and
/// shares them across requests.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let providers = steward_providers::build_from_config(&config);
    let provider = providers
        .default()
        .ok_or_else(|| format!("Provider '{}' is not configured", config.default_provider))?;
    let tools = Arc::new(steward_tools::default_registry(&config.tools)?);

    let state = Arc::new(GatewayState {
        provider,
        model: steward_providers::resolve_model(&config),
        tools,
        personas: Arc::new(config.persona_catalog()),
        settings: LoopSettings::from_config(&config.agent),
        api_key: config.gateway.api_key.clone(),
    });

    let app = build_router(state, &config.gateway.allowed_origins);

    info!(addr = %addr, provider = %config.default_provider, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Middleware ---

async fn api_key_middleware(
    State(state): State<SharedState>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided == Some(expected) {
        Ok(next.run(req).await)
    } else {
        warn!(path = %req.uri().path(), "Rejected request with missing or invalid API key");
        Err(StatusCode::UNAUTHORIZED)
    }
}

// --- Handlers ---

#[derive(Serialize, Deserialize)]
struct StatusResponse {
    status: String,
}

async fn root_handler() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "Autonomous agent backend is running".into(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize, Deserialize)]
struct ToolListResponse {
    count: usize,
    tools: Vec<ToolDefinition>,
}

async fn tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let tools = state.tools.definitions();
    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}

#[derive(Deserialize)]
struct ExecuteRequest {
    user_query: String,
}

#[derive(Serialize, Deserialize)]
struct ExecuteResponse {
    final_response: String,
    intermediate_steps: Vec<AgentResponse>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn execute_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, (StatusCode, Json<ErrorResponse>)> {
    let query = payload.user_query.trim();
    if query.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "user_query must not be empty".into(),
            }),
        ));
    }

    info!(query_len = query.len(), "Agent execution requested");
    let result = state.agent().execute(query).await;
    info!(
        iterations = result.iterations,
        task_complete = result.task_complete,
        steps = result.intermediate_steps.len(),
        "Agent execution finished"
    );

    Ok(Json(ExecuteResponse {
        final_response: result.final_response,
        intermediate_steps: result.intermediate_steps,
    }))
}
