//! The web service.
//!
//! A small JSON API plus session-gated account pages, served by axum on a
//! single-threaded runtime. Store and generation calls are blocking, so
//! handlers move them onto the blocking pool.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /`, `/hello`, `/time` | liveness and database time |
//! | `GET /examples?expression=` | stored example sentences |
//! | `POST /upload-audio` | save, transcribe and give feedback |
//! | `GET /recordings`, `DELETE /recordings/:filename` | manage uploads |
//! | `POST /pronounce` | MP3 for a phrase |
//! | `GET\|POST /login`, `GET /logout`, `GET /dashboard` | accounts |

mod handlers;
mod pages;
pub mod response;
mod routes;

pub use routes::create_router;

use crate::auth::SessionStore;
use crate::client::{SpeechSynthesizer, Transcriber, Tutor};
use crate::config::SiteConfig;
use crate::store::Database;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Everything a request handler can reach.
pub struct AppState {
    pub config: SiteConfig,
    pub recordings_dir: PathBuf,
    pub db: Database,
    pub transcriber: Arc<dyn Transcriber>,
    pub tutor: Arc<dyn Tutor>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub sessions: SessionStore,
}

/// Bind `bind_address` and serve until Ctrl+C or SIGTERM.
pub async fn serve(state: Arc<AppState>, bind_address: &str) -> std::io::Result<()> {
    let app = create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!(address = bind_address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

    info!("shutdown signal received, draining connections");
}
