//! Server mode
//!
//! This module contains the HTTP server startup logic.
//! It wires the resolver into actix-web and starts listening.

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::Result;
use tracing::{info, warn};

use crate::api::middleware::{RequestIdMiddleware, TimingMiddleware};
use crate::api::services::{AppStartTime, detect_routes, frontend_routes, health_routes};
use crate::config::{RoutesConfig, StaticConfig};
use crate::services::{GeoIpProvider, GeoResolver};

/// 每个 worker 共享的应用状态（全部可廉价 clone）
#[derive(Clone)]
pub struct AppState {
    pub resolver: GeoResolver,
    pub routes: RoutesConfig,
    pub start_time: AppStartTime,
}

impl AppState {
    /// 使用指定 provider 构造，测试中用来注入桩实现
    pub fn with_provider(provider: GeoIpProvider, config: &StaticConfig) -> Self {
        Self {
            resolver: GeoResolver::new(provider, config.cookie.clone()),
            routes: config.routes.clone(),
            start_time: AppStartTime::now(),
        }
    }
}

/// 根据静态配置构造应用状态
pub fn build_app_state(config: &StaticConfig) -> Result<AppState> {
    let provider = GeoIpProvider::new(&config.provider)?;
    Ok(AppState::with_provider(provider, config))
}

/// 注册路由，server 和测试共用
pub fn configure_app(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(web::Data::new(state.resolver.clone()))
        .app_data(web::Data::new(state.routes.clone()))
        .app_data(web::Data::new(state.start_time.clone()))
        .service(detect_routes(&state.routes.detect_path))
        .service(health_routes(&state.routes.health_prefix))
        .service(frontend_routes());
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: &StaticConfig) -> Result<()> {
    let state = build_app_state(config).map_err(|e| {
        tracing::error!("Server startup failed: {}", e);
        e
    })?;

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    info!("Using {} CPU cores for the server", cpu_count);
    info!(
        "Detect endpoint: {}, health endpoint: {}",
        state.routes.detect_path, state.routes.health_prefix
    );
    if !state.resolver.provider().is_configured() {
        warn!(
            "Provider api_key missing: set GEO__PROVIDER__API_KEY or {}",
            crate::config::LEGACY_API_KEY_ENV
        );
    }

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TimingMiddleware) // 最外层，记录请求延迟
            .wrap(RequestIdMiddleware)
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    // 定位结果因人而异，禁止中间层缓存
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .configure(|cfg| configure_app(cfg, &state))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);

    // actix 自带 SIGINT/SIGTERM 处理，收到信号后优雅关闭
    server.bind(bind_address)?.run().await?;

    info!("Server stopped");
    Ok(())
}
