// Load state for views backed by the API client.
// Separates "retrying" from "failed" and ignores results of cancelled requests.

use crate::api::RetryEvent;
use crate::error::{ApiError, Result};

/// Loading state for async data.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadState<T> {
    #[default]
    Idle,
    Loading,
    /// A transient failure happened and another attempt is scheduled.
    Retrying { attempt: u32, total_attempts: u32 },
    Loaded(T),
    Failed { message: String, transient: bool },
}

impl<T> LoadState<T> {
    pub fn start(&mut self) {
        *self = LoadState::Loading;
    }

    /// Record a scheduled retry reported by the client.
    pub fn on_retry(&mut self, event: &RetryEvent<'_>) {
        *self = LoadState::Retrying {
            attempt: event.attempt,
            total_attempts: event.total_attempts,
        };
    }

    /// Apply the outcome of a request.
    ///
    /// Cancellation means a newer request replaced this one, so the state is
    /// left alone and `false` is returned.
    pub fn resolve(&mut self, result: Result<T>) -> bool {
        *self = match result {
            Ok(data) => LoadState::Loaded(data),
            Err(ApiError::Cancelled) => return false,
            Err(err) => LoadState::Failed {
                message: err.user_message(),
                transient: err.is_transient(),
            },
        };
        true
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading | LoadState::Retrying { .. })
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(data) => Some(data),
            _ => None,
        }
    }

    /// One-line status for a banner or status bar.
    pub fn status_line(&self) -> Option<String> {
        match self {
            LoadState::Idle | LoadState::Loaded(_) => None,
            LoadState::Loading => Some("Loading...".to_string()),
            LoadState::Retrying {
                attempt,
                total_attempts,
            } => Some(format!(
                "Connection issue. Retrying... ({}/{})",
                attempt,
                total_attempts.saturating_sub(1)
            )),
            LoadState::Failed { message, .. } => Some(message.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BUSY_MESSAGE;
    use reqwest::StatusCode;
    use std::time::Duration;

    #[test]
    fn test_success_path() {
        let mut state = LoadState::default();
        assert_eq!(state.status_line(), None);

        state.start();
        assert!(state.is_loading());

        assert!(state.resolve(Ok(vec![1, 2, 3])));
        assert!(state.is_loaded());
        assert_eq!(state.data(), Some(&vec![1, 2, 3]));
        assert_eq!(state.status_line(), None);
    }

    #[test]
    fn test_retrying_then_exhausted() {
        let mut state: LoadState<()> = LoadState::default();
        state.start();

        let error = ApiError::status(StatusCode::SERVICE_UNAVAILABLE, None);
        state.on_retry(&RetryEvent {
            attempt: 1,
            total_attempts: 3,
            delay: Duration::from_secs(1),
            error: &error,
        });
        assert!(state.is_loading());
        assert_eq!(
            state.status_line().as_deref(),
            Some("Connection issue. Retrying... (1/2)")
        );

        state.resolve(Err(error));
        assert_eq!(
            state,
            LoadState::Failed {
                message: BUSY_MESSAGE.to_string(),
                transient: true
            }
        );
    }

    #[test]
    fn test_cancellation_is_ignored() {
        let mut state: LoadState<u32> = LoadState::Loaded(7);
        assert!(!state.resolve(Err(ApiError::Cancelled)));
        assert_eq!(state, LoadState::Loaded(7));
    }

    #[test]
    fn test_terminal_failure_message() {
        let mut state: LoadState<u32> = LoadState::Loading;
        state.resolve(Err(ApiError::status(
            StatusCode::NOT_FOUND,
            Some("Product not found".into()),
        )));
        assert_eq!(state.status_line().as_deref(), Some("Product not found"));
        assert!(!state.is_loading());
    }
}
