use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::{error, info, warn};

use menu_api_server::config::Settings;
use menu_api_server::database::{DbPool, Repository};
use menu_api_server::handlers;
use menu_api_server::services::{
    DishesService, MenusService, RedisCache, ResponseCache, SubmenusService,
};
use menu_api_server::state::AppState;
use menu_api_server::sync::{MenuStore, SyncRunner};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,menu_api_server=debug".to_string()),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting menu API server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("Configuration loaded");

    // Initialize database pool
    let db_pool = DbPool::new(&settings.database).await?;
    info!("Database connection established");

    // Initialize repository
    let repository = Arc::new(Repository::new(db_pool));
    repository.ensure_schema().await?;

    // Initialize cache
    let cache: Arc<dyn ResponseCache> = Arc::new(RedisCache::connect(&settings.redis).await?);
    info!("Redis connection established");

    // Initialize services
    let menus_service = Arc::new(MenusService::new(repository.clone(), cache.clone()));
    let submenus_service = Arc::new(SubmenusService::new(repository.clone(), cache.clone()));
    let dishes_service = Arc::new(DishesService::new(repository.clone(), cache.clone()));

    let store: Arc<dyn MenuStore> = repository.clone();
    let sync_runner = Arc::new(SyncRunner::new(store, cache, reqwest::Client::new()));

    let state = AppState {
        repository,
        menus: menus_service,
        submenus: submenus_service,
        dishes: dishes_service,
        sync_runner: sync_runner.clone(),
        settings: settings.clone(),
    };

    // Periodic reconciliation against the configured source
    if settings.sync.interval_seconds > 0 {
        let runner = sync_runner;
        let source = settings.sync.source.clone();
        let period = Duration::from_secs(settings.sync.interval_seconds);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; the run belongs to the next one.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match runner.run(&source).await {
                    Ok(true) => {}
                    Ok(false) => warn!("Scheduled sync skipped: no usable source data"),
                    Err(err) => error!("Scheduled sync failed mid-apply: {}", err),
                }
            }
        });
        info!(
            "Scheduled sync every {}s from {}",
            settings.sync.interval_seconds, settings.sync.source
        );
    }

    // Build router
    let app = build_router(state);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/menus",
            get(handlers::menus::list_menus).post(handlers::menus::create_menu),
        )
        .route("/menus/tree", get(handlers::menus::menu_tree))
        .route(
            "/menus/{menu_id}",
            get(handlers::menus::detail_menu)
                .patch(handlers::menus::update_menu)
                .delete(handlers::menus::delete_menu),
        )
        .route(
            "/menus/{menu_id}/submenus",
            get(handlers::submenus::list_submenus).post(handlers::submenus::create_submenu),
        )
        .route(
            "/menus/{menu_id}/submenus/{submenu_id}",
            get(handlers::submenus::detail_submenu)
                .patch(handlers::submenus::update_submenu)
                .delete(handlers::submenus::delete_submenu),
        )
        .route(
            "/menus/{menu_id}/submenus/{submenu_id}/dishes",
            get(handlers::dishes::list_dishes).post(handlers::dishes::create_dish),
        )
        .route(
            "/menus/{menu_id}/submenus/{submenu_id}/dishes/{dish_id}",
            get(handlers::dishes::detail_dish)
                .patch(handlers::dishes::update_dish)
                .delete(handlers::dishes::delete_dish),
        )
        .route("/sync", post(handlers::sync::trigger_sync));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .nest("/api/v1", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}
