mod account;
mod api;
mod audio;

pub use account::{dashboard, login, login_page, logout};
pub use api::{db_time, get_examples, hello, root};
pub use audio::{delete_recording, list_recordings, pronounce, upload_audio};

use super::response::ApiError;
use crate::store::StoreError;

/// Run blocking store or API work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {e}")))
}

pub(crate) fn store_error(e: StoreError) -> ApiError {
    tracing::error!(error = %e, "store failure");
    ApiError::internal(e.to_string())
}
