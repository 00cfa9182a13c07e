//! Bounded calls to external capabilities.
//!
//! Every completion, calendar, and email call goes through [`bounded`] so a
//! slow collaborator surfaces as a [`CapabilityError::Timeout`] instead of
//! stalling the session that made the call.

use std::future::Future;
use std::time::Duration;

use crate::error::{Capability, CapabilityError};

/// Run `call` with a time limit, mapping an elapsed deadline to
/// [`CapabilityError::Timeout`].
pub async fn bounded<T, F>(
    capability: Capability,
    limit: Duration,
    call: F,
) -> Result<T, CapabilityError>
where
    F: Future<Output = Result<T, CapabilityError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(%capability, limit_ms = limit.as_millis() as u64, "Capability call timed out");
            Err(CapabilityError::Timeout {
                capability,
                after_ms: limit.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through_success() {
        let result = bounded(Capability::Completion, Duration::from_secs(1), async {
            Ok::<_, CapabilityError>("hello".to_string())
        })
        .await;
        assert_eq!(result.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_bounded_passes_through_error() {
        let result: Result<(), _> = bounded(Capability::Email, Duration::from_secs(1), async {
            Err(CapabilityError::Email("rejected".to_string()))
        })
        .await;
        assert_eq!(result.unwrap_err(), CapabilityError::Email("rejected".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let result: Result<(), _> = bounded(Capability::Calendar, Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert_eq!(
            result.unwrap_err(),
            CapabilityError::Timeout {
                capability: Capability::Calendar,
                after_ms: 50
            }
        );
    }
}
