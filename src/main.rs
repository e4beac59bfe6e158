use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use city_weather_dashboard::{
    cache::CacheManager,
    config::Config,
    dashboard::Dashboard,
    lifecycle::BackgroundTasks,
    routes::{create_router, AppState},
    search::SearchDebouncer,
    store::SqliteStore,
    view::ViewState,
    weather::{openweather::OpenWeatherClient, WeatherGateway},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "city_weather_dashboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
    }

    // Initialize store
    let pool = sqlx::SqlitePool::connect(&config.database_url).await?;
    let store = SqliteStore::new(pool);
    store.init_tables().await?;
    store.health_check().await?;

    let client = OpenWeatherClient::new(&config)?;
    let gateway = Arc::new(WeatherGateway::new(client, CacheManager::new(store)));

    let mut dashboard = Dashboard::load(gateway.clone(), ViewState::new(), config.system_theme).await?;
    dashboard.start().await?;
    let dashboard = Arc::new(Mutex::new(dashboard));

    let mut tasks = BackgroundTasks::start(dashboard.clone());

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        config: Arc::new(config),
        dashboard,
        search: Arc::new(Mutex::new(SearchDebouncer::new(gateway))),
    };

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server starting on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tasks.stop();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
