use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    config::Config,
    dashboard::{Dashboard, DashboardError},
    i18n,
    search::{SearchDebouncer, Suggestions},
    settings::{City, Language, Settings, TempUnit, Theme, TimeFormat},
    store::KeyValueStore,
    view::{SearchPurpose, ViewState},
};

pub type SharedDashboard<S> = Arc<Mutex<Dashboard<S, ViewState>>>;

// Shared application state
pub struct AppState<S> {
    pub config: Arc<Config>,
    pub dashboard: SharedDashboard<S>,
    pub search: Arc<Mutex<SearchDebouncer<S>>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            dashboard: self.dashboard.clone(),
            search: self.search.clone(),
        }
    }
}

// Request/Response types
#[derive(Debug, Deserialize)]
pub struct ThemeRequest {
    pub theme: Theme,
}

#[derive(Debug, Deserialize)]
pub struct TimeFormatRequest {
    pub time_format: TimeFormat,
}

#[derive(Debug, Deserialize)]
pub struct TempUnitRequest {
    pub temp_unit: TempUnit,
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub language: Language,
}

#[derive(Debug, Deserialize)]
pub struct CityRequest {
    pub name: String,
    pub lat: String,
    pub lon: String,
}

impl From<CityRequest> for City {
    fn from(request: CityRequest) -> Self {
        City::new(request.name, request.lat, request.lon)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchOpenRequest {
    pub purpose: SearchPurpose,
}

#[derive(Debug, Deserialize)]
pub struct SearchInput {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub api_key_configured: bool,
}

/// Error response helper
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
            timestamp: Utc::now(),
        }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn error_response(err: DashboardError, language: Language) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        DashboardError::Validation(e) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(i18n::translate(language, e.notice_key()), e.notice_key())),
        ),
        DashboardError::Fetch(e) => {
            tracing::error!("Request failed upstream: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new(&e.message, e.kind.notice_key())),
            )
        }
        DashboardError::Store(e) => {
            tracing::error!("Persistence failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(&e.to_string(), "storeError")),
            )
        }
    }
}

// Snapshot for the front-end; notices are delivered once
fn snapshot<S: KeyValueStore>(dashboard: &mut Dashboard<S, ViewState>) -> ViewState {
    let view = dashboard.renderer().clone();
    dashboard.renderer_mut().take_notices();
    view
}

fn respond<S: KeyValueStore>(
    dashboard: &mut Dashboard<S, ViewState>,
    result: Result<(), DashboardError>,
) -> ApiResult<ViewState> {
    match result {
        Ok(()) => Ok(Json(snapshot(dashboard))),
        Err(e) => Err(error_response(e, dashboard.settings().language)),
    }
}

// Route handlers
pub async fn health<S: KeyValueStore>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        api_key_configured: state.config.openweather_api_key.is_some(),
    })
}

pub async fn get_dashboard<S: KeyValueStore>(State(state): State<AppState<S>>) -> Json<ViewState> {
    let mut dashboard = state.dashboard.lock().await;
    Json(snapshot(&mut dashboard))
}

pub async fn get_settings<S: KeyValueStore>(State(state): State<AppState<S>>) -> Json<Settings> {
    Json(state.dashboard.lock().await.settings().clone())
}

pub async fn set_theme<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<ThemeRequest>,
) -> ApiResult<ViewState> {
    let mut dashboard = state.dashboard.lock().await;
    let result = dashboard.set_theme(request.theme).await;
    respond(&mut dashboard, result)
}

pub async fn set_system_theme<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<ThemeRequest>,
) -> ApiResult<ViewState> {
    let mut dashboard = state.dashboard.lock().await;
    let result = dashboard.on_system_theme_changed(request.theme).await;
    respond(&mut dashboard, result)
}

pub async fn set_time_format<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<TimeFormatRequest>,
) -> ApiResult<ViewState> {
    let mut dashboard = state.dashboard.lock().await;
    let result = dashboard.set_time_format(request.time_format).await;
    respond(&mut dashboard, result)
}

pub async fn set_temp_unit<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<TempUnitRequest>,
) -> ApiResult<ViewState> {
    let mut dashboard = state.dashboard.lock().await;
    let result = dashboard.set_temp_unit(request.temp_unit).await;
    respond(&mut dashboard, result)
}

pub async fn set_language<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<LanguageRequest>,
) -> ApiResult<ViewState> {
    let mut dashboard = state.dashboard.lock().await;
    let result = dashboard.change_language(request.language).await;
    respond(&mut dashboard, result)
}

pub async fn add_city<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<CityRequest>,
) -> ApiResult<ViewState> {
    let mut dashboard = state.dashboard.lock().await;
    let result = dashboard.add_city(request.into()).await;
    respond(&mut dashboard, result)
}

pub async fn remove_city<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> ApiResult<ViewState> {
    let mut dashboard = state.dashboard.lock().await;
    let result = dashboard.remove_city(&name).await;
    respond(&mut dashboard, result)
}

/// Main-city pick from the search dialog.
pub async fn choose_main_city<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<CityRequest>,
) -> ApiResult<ViewState> {
    let mut dashboard = state.dashboard.lock().await;
    let result = dashboard.choose_main_from_search(request.into()).await;
    respond(&mut dashboard, result)
}

pub async fn replace_main_city<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<CityRequest>,
) -> ApiResult<ViewState> {
    let mut dashboard = state.dashboard.lock().await;
    let result = dashboard.set_main_city(request.into()).await;
    respond(&mut dashboard, result)
}

pub async fn promote_city<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> ApiResult<ViewState> {
    let mut dashboard = state.dashboard.lock().await;
    let result = dashboard.promote_to_main(&name).await;
    respond(&mut dashboard, result)
}

/// Placeholder click. A full city list leaves the view unchanged.
pub async fn open_search<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<SearchOpenRequest>,
) -> Json<ViewState> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.open_city_search(request.purpose);
    Json(snapshot(&mut dashboard))
}

pub async fn search_input<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<SearchInput>,
) -> StatusCode {
    let language = state.dashboard.lock().await.settings().language;
    state.search.lock().await.input(&request.query, language);
    StatusCode::ACCEPTED
}

pub async fn search_suggestions<S: KeyValueStore>(State(state): State<AppState<S>>) -> Json<Suggestions> {
    Json(state.search.lock().await.latest())
}

// Create the router
pub fn create_router<S: KeyValueStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health::<S>))
        .route("/dashboard", get(get_dashboard::<S>))
        .route("/settings", get(get_settings::<S>))
        .route("/settings/theme", put(set_theme::<S>))
        .route("/settings/system-theme", post(set_system_theme::<S>))
        .route("/settings/time-format", put(set_time_format::<S>))
        .route("/settings/temp-unit", put(set_temp_unit::<S>))
        .route("/settings/language", put(set_language::<S>))
        .route("/cities", post(add_city::<S>))
        .route("/main-city", post(choose_main_city::<S>).put(replace_main_city::<S>))
        .route("/cities/:name", delete(remove_city::<S>))
        .route("/cities/:name/promote", post(promote_city::<S>))
        .route("/search/open", post(open_search::<S>))
        .route("/search/input", post(search_input::<S>))
        .route("/search/suggestions", get(search_suggestions::<S>))
        .with_state(state)
}
