//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::Hub;
use crate::config::{Settings, StoreBackend};
use crate::domain::Repositories;
use crate::infrastructure::database;
use crate::infrastructure::repositories::{pg_repositories, MemoryStore};
use crate::presentation::http::handlers::health;
use crate::presentation::http::routes;
use crate::presentation::middleware::{create_cors_layer, create_trace_layer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    /// `None` with the memory backend
    pub pool: Option<PgPool>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Assemble state around an already-built store.
    pub fn new(settings: Settings, repos: Repositories, pool: Option<PgPool>) -> Self {
        let hub = Hub::new(repos, settings.jwt.clone(), settings.websocket.clone());
        Self {
            hub: Arc::new(hub),
            pool,
            settings: Arc::new(settings),
        }
    }
}

/// Router with every route and the global middleware stack
pub fn build_router(state: AppState) -> Router {
    let cors = create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let (repos, pool) = match settings.store.backend {
            StoreBackend::Postgres => {
                let pool = database::create_pool(&settings.database).await?;
                tracing::info!("Database connection pool created");

                if settings.store.run_migrations {
                    database::run_migrations(&pool).await?;
                    tracing::info!("Database migrations applied");
                }
                (pg_repositories(pool.clone()), Some(pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; nothing is persisted");
                (Arc::new(MemoryStore::new()).repositories(), None)
            }
        };

        let addr: SocketAddr = settings.server_addr().parse()?;
        let state = AppState::new(settings, repos, pool);
        let router = build_router(state);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
