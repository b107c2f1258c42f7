//! Binding of the OAuth `state` parameter to the browser's session

use tower_sessions::Session;
use tracing::{debug, error};
use uuid::Uuid;

use crate::constants::OAUTH_STATE_KEY;
use crate::error::RelayError;

/// A fresh, unguessable `state` value
pub(crate) fn new_state_token() -> String {
    Uuid::new_v4().to_string()
}

/// Store the `state` sent to the provider so the callback can be matched to it
pub(crate) async fn remember_state(session: &Session, state: &str) -> Result<(), RelayError> {
    session
        .insert(OAUTH_STATE_KEY, state.to_string())
        .await
        .inspect_err(|err| {
            error!("Failed to store OAuth state in session: {:?}", err);
        })?;
    debug!("Stored OAuth state in session");
    Ok(())
}

/// Check the callback's `state` against the session and remove it (one-time use)
pub(crate) async fn validate_state(
    session: &Session,
    presented: Option<&str>,
) -> Result<(), RelayError> {
    let stored: Option<String> = session.remove(OAUTH_STATE_KEY).await.inspect_err(|err| {
        error!("Failed to retrieve OAuth state from session: {:?}", err);
    })?;

    match (stored, presented) {
        (Some(stored), Some(presented)) if stored == presented => Ok(()),
        (Some(_), _) => {
            error!("OAuth state mismatch");
            Err(RelayError::InvalidState)
        }
        (None, _) => {
            error!("No OAuth state found in session");
            Err(RelayError::InvalidState)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::logging::setup_test_logging;

    fn test_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[test]
    fn test_state_tokens_are_unique() {
        let first = new_state_token();
        let second = new_state_token();
        assert_eq!(first.len(), 36);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_state_validation_valid() {
        setup_test_logging();
        let session = test_session();
        let state = new_state_token();

        remember_state(&session, &state)
            .await
            .expect("Failed to store state");

        let result = validate_state(&session, Some(&state)).await;
        assert!(result.is_ok(), "Matching state should pass validation");

        let stored: Option<String> = session
            .get(OAUTH_STATE_KEY)
            .await
            .expect("Failed to check session");
        assert_eq!(stored, None, "State should be removed after validation");
    }

    #[tokio::test]
    async fn test_state_validation_mismatch() {
        setup_test_logging();
        let session = test_session();

        remember_state(&session, &new_state_token())
            .await
            .expect("Failed to store state");

        let result = validate_state(&session, Some("wrong-state")).await;
        assert!(matches!(result, Err(RelayError::InvalidState)));
    }

    #[tokio::test]
    async fn test_state_validation_missing_from_callback() {
        setup_test_logging();
        let session = test_session();

        remember_state(&session, &new_state_token())
            .await
            .expect("Failed to store state");

        let result = validate_state(&session, None).await;
        assert!(matches!(result, Err(RelayError::InvalidState)));
    }

    #[tokio::test]
    async fn test_state_validation_missing_from_session() {
        setup_test_logging();
        let session = test_session();

        let result = validate_state(&session, Some("any-state")).await;
        assert!(matches!(result, Err(RelayError::InvalidState)));
    }

    #[tokio::test]
    async fn test_state_one_time_use() {
        setup_test_logging();
        let session = test_session();
        let state = new_state_token();

        remember_state(&session, &state)
            .await
            .expect("Failed to store state");

        assert!(validate_state(&session, Some(&state)).await.is_ok());
        assert!(
            validate_state(&session, Some(&state)).await.is_err(),
            "Second validation should fail (one-time use)"
        );
    }
}
