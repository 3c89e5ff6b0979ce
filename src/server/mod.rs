// HTTP server for the debate simulator

mod error;
mod handlers;
mod middleware;
mod session;

pub use error::AppError;
pub use handlers::create_router;
pub use middleware::{rate_limit_middleware, RateLimiter};
pub use session::SessionRegistry;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::gemini::{GenerateReply, TextGenerator};
use crate::metrics::{MetricsLogger, RequestMetric};
use crate::moderator::Moderator;
use crate::store::TranscriptStore;

/// Shared state behind every handler.
pub struct AppState {
    pub config: Config,
    pub generator: Arc<dyn TextGenerator>,
    pub store: TranscriptStore,
    pub sessions: SessionRegistry,
    pub metrics: Arc<MetricsLogger>,
}

impl AppState {
    pub fn new(
        config: Config,
        generator: Arc<dyn TextGenerator>,
        store: TranscriptStore,
    ) -> Result<Self> {
        let sessions = SessionRegistry::new(
            config.server.max_sessions,
            config.server.session_timeout_minutes,
        );
        let metrics = Arc::new(MetricsLogger::new(config.metrics_dir.clone())?);
        Ok(Self {
            config,
            generator,
            store,
            sessions,
            metrics,
        })
    }

    /// Configuration errors surface as an immediate 500 on the endpoints
    /// that need the credential; the rest of the API stays up.
    pub fn require_credential(&self) -> Result<(), AppError> {
        if self.config.api_key.is_empty() {
            return Err(AppError::MissingCredential);
        }
        Ok(())
    }

    pub fn moderator(&self) -> Moderator {
        Moderator::new(Arc::clone(&self.generator))
    }

    /// Record one handled request; metrics failures never fail requests.
    pub fn log_metric(&self, endpoint: &str, topic: &str, start: Instant, reply: &GenerateReply) {
        let metric = RequestMetric {
            timestamp: chrono::Utc::now().to_rfc3339(),
            endpoint: endpoint.to_string(),
            topic_hash: MetricsLogger::hash_topic(topic),
            duration_ms: start.elapsed().as_millis() as u64,
            upstream_status: reply.status,
            ok: reply.ok,
        };
        if let Err(e) = self.metrics.log(&metric) {
            tracing::warn!("failed to log request metric: {:#}", e);
        }
    }
}

/// The debate server: owns the shared state and the bind/serve lifecycle.
pub struct DebateServer {
    state: Arc<AppState>,
}

impl DebateServer {
    pub fn new(
        config: Config,
        generator: Arc<dyn TextGenerator>,
        store: TranscriptStore,
    ) -> Result<Self> {
        Ok(Self {
            state: Arc::new(AppState::new(config, generator, store)?),
        })
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Bind and serve until the process exits.
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self.state.config.server.bind_address.parse()?;

        // One upstream call per request at most, so a modest per-IP budget
        // comfortably covers interactive use.
        let limiter = RateLimiter::new(2.0, 10.0);

        // Periodic housekeeping: drop idle debate runners and stale
        // rate-limit buckets.
        let purge_state = Arc::clone(&self.state);
        let purge_limiter = limiter.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                let dropped = purge_state.sessions.purge_idle();
                if dropped > 0 {
                    tracing::debug!("purged {} idle debate sessions", dropped);
                }
                purge_limiter.purge_idle(300);
            }
        });

        // Natural-language payloads are small; 1MB blocks oversized bodies
        // without bothering real clients.
        let app = create_router(Arc::clone(&self.state)).layer(
            tower::ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
                .layer(axum::Extension(limiter))
                .layer(axum::middleware::from_fn(rate_limit_middleware)),
        );

        tracing::info!("Starting Podium debate server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
