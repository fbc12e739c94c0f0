use std::sync::Arc;

use tracing::error;
use wisp_db::{Database, StoreError};

use crate::admin::AdminGate;
use crate::error::ApiError;
use crate::rate_limit::RateLimiter;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub limiter: RateLimiter,
    pub admin: AdminGate,
    pub settings: Settings,
}

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Take the client identity from `X-Forwarded-For` (reverse proxy setups).
    pub trust_forwarded_for: bool,
    /// Chance that a read-path request also runs a sweep.
    pub sweep_probability: f64,
}

/// Run blocking storage work off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || f(state.as_ref()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::from(e)
        })?;

    Ok(result?)
}
