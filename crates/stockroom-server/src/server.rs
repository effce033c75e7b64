use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    middleware::{from_fn, from_fn_with_state},
    routing::{MethodRouter, delete, get, post, put},
};
use stockroom_api::ApiError;
use stockroom_auth::{
    AuthState, JwtService, Permission, authentication_middleware, require_permission,
};
use stockroom_storage::DynDocumentStore;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::cache::{DynCacheStore, EntityCache};
use crate::config::{AppConfig, StorageBackend};
use crate::handlers;
use crate::middleware::{self as app_middleware, RequestId};
use crate::refresher::CacheRefresher;
use crate::repository::{ProductRepository, UserRepository};

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub products: ProductRepository,
    pub jwt: Arc<JwtService>,
    pub cache: EntityCache,
    pub storage_backend: &'static str,
}

impl AppState {
    pub fn new(store: DynDocumentStore, cache: EntityCache, jwt: Arc<JwtService>) -> Self {
        Self {
            users: UserRepository::new(store.clone(), cache.clone()),
            products: ProductRepository::new(store.clone(), cache.clone()),
            jwt,
            cache,
            storage_backend: store.backend_name(),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        AuthState::new(state.jwt.clone())
    }
}

fn guarded(route: MethodRouter<AppState>, permission: Permission) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(permission, require_permission))
}

fn routes(state: &AppState) -> Router<AppState> {
    use handlers::{auth, health, products, roles, users};

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login));

    let protected = Router::new()
        .route("/users", guarded(get(users::list_users), Permission::ListUsers))
        .route(
            "/user/{id}",
            guarded(get(users::get_user), Permission::ReadUser)
                .merge(guarded(put(users::update_user), Permission::UpdateUser))
                .merge(guarded(delete(users::delete_user), Permission::DeleteUser)),
        )
        .route(
            "/roles",
            guarded(get(roles::list_roles), Permission::ListRoles)
                .merge(guarded(post(roles::assign_role), Permission::AssignRole)),
        )
        .route(
            "/products",
            guarded(get(products::list_products), Permission::ListProducts),
        )
        .route(
            "/product",
            guarded(post(products::create_product), Permission::CreateProduct),
        )
        .route(
            "/product/{id}",
            guarded(get(products::get_product), Permission::ReadProduct)
                .merge(guarded(put(products::update_product), Permission::UpdateProduct))
                .merge(guarded(delete(products::delete_product), Permission::DeleteProduct)),
        )
        .route_layer(from_fn_with_state(
            AuthState::from_ref(state),
            authentication_middleware,
        ));

    public.merge(protected)
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    let router = routes(&state)
        .method_not_allowed_fallback(|| async {
            ApiError::method_not_allowed("Method not allowed")
        })
        .fallback(|| async { ApiError::not_found("Route not found") })
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<RequestId>()
                        .map(|id| id.as_str().to_string())
                        .unwrap_or_default();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        );

    let router = if cfg.server.cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    // Outermost, so the trace span above can read the id.
    router.layer(from_fn(app_middleware::request_id))
}

pub struct StockroomServer {
    addr: SocketAddr,
    app: Router,
    refresher: Option<(CacheRefresher, std::time::Duration)>,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Connects storage and cache, seeds the admin if configured, and
    /// assembles the router.
    pub async fn build(self) -> anyhow::Result<StockroomServer> {
        let cfg = self.config;

        let store = create_document_store(&cfg).await?;
        let cache_store: DynCacheStore = Arc::new(crate::create_cache_backend(&cfg.redis).await);
        let cache = EntityCache::new(cache_store, cfg.cache.ttls());
        let jwt = Arc::new(JwtService::new(
            cfg.auth.jwt_secret.as_bytes(),
            cfg.auth.token_lifetime(),
        )?);

        let state = AppState::new(store.clone(), cache.clone(), jwt);
        tracing::info!(
            storage = state.storage_backend,
            cache = cache.mode(),
            "state initialized"
        );

        if let Some(seed) = &cfg.server.seed_admin {
            crate::bootstrap::seed_master_admin(&state.users, seed).await?;
        }

        let refresher = cfg
            .cache
            .refresh_enabled
            .then(|| (CacheRefresher::new(store, cache), cfg.cache.refresh_interval()));

        Ok(StockroomServer {
            addr: self.addr,
            app: build_app(state, &cfg),
            refresher,
        })
    }
}

pub async fn create_document_store(cfg: &AppConfig) -> anyhow::Result<DynDocumentStore> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory storage");
            Ok(stockroom_db_memory::create_memory_store())
        }
        StorageBackend::Postgres => {
            let pg = cfg
                .storage
                .postgres
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("storage.postgres is required"))?;
            Ok(stockroom_db_postgres::create_store(pg).await?)
        }
    }
}

impl StockroomServer {
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Serves until Ctrl-C or SIGTERM, then stops the refresher.
    pub async fn run(self) -> anyhow::Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let refresher = self
            .refresher
            .map(|(refresher, period)| refresher.spawn(period, shutdown_rx));

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        let _ = shutdown_tx.send(true);
        if let Some(handle) = refresher {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "cache refresher ended abnormally");
            }
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
