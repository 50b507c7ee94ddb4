use crate::error::{LlmError, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Runs `fut` to completion unless `cancel` fires first, in which case the
/// future is dropped and `LlmError::Cancelled` is returned.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LlmError::Cancelled),
        out = fut => out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_output_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let v = cancellable(&cancel, async { Ok::<_, LlmError>(7) }).await;
        assert_eq!(v.expect("value"), 7);
    }

    #[tokio::test]
    async fn pre_cancelled_token_wins_over_ready_future() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let v = cancellable(&cancel, async { Ok::<_, LlmError>(7) }).await;
        assert!(matches!(v, Err(LlmError::Cancelled)));
    }

    #[tokio::test]
    async fn cancels_pending_future() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let v = cancellable(&cancel, async {
            std::future::pending::<()>().await;
            Ok::<_, LlmError>(())
        })
        .await;
        assert!(matches!(v, Err(LlmError::Cancelled)));
    }
}
