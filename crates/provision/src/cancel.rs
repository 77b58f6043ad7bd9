//! First-failure capture and batch cancellation.
//!
//! A batch shares one [`CancellationController`] between all its units. The
//! first unit to report a failure wins the single slot of the failure
//! channel and cancels the batch; every later failure finds the slot full and
//! is dropped. Only one error per batch is ever observable.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::error::ProvisionError;

/// Shared cancellation signal plus a capacity-one failure slot.
#[derive(Debug, Clone)]
pub struct CancellationController {
    token: CancellationToken,
    slot: mpsc::Sender<ProvisionError>,
}

/// Receiving side of the failure slot, held by the orchestrator.
#[derive(Debug)]
pub struct FirstFailure {
    slot: mpsc::Receiver<ProvisionError>,
}

impl CancellationController {
    /// New batch scope nested under the caller's `scope`.
    ///
    /// Cancelling `scope` cancels the batch as well; cancelling the batch
    /// leaves `scope` untouched.
    pub fn new(scope: &CancellationToken) -> (Self, FirstFailure) {
        let (tx, rx) = mpsc::channel(1);
        (
            Self {
                token: scope.child_token(),
                slot: tx,
            },
            FirstFailure { slot: rx },
        )
    }

    /// Whether the batch has been cancelled, by a failure or by the caller.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Offer `error` as the batch failure without blocking.
    ///
    /// Returns `true` if this was the first report, in which case the batch
    /// is now cancelled. Later reports return `false` and are discarded.
    pub fn report(&self, error: ProvisionError) -> bool {
        match self.slot.try_send(error) {
            Ok(()) => {
                self.token.cancel();
                true
            }
            Err(TrySendError::Full(dropped)) | Err(TrySendError::Closed(dropped)) => {
                tracing::debug!(error = %dropped, "dropping secondary failure");
                false
            }
        }
    }
}

impl FirstFailure {
    /// The retained failure, if any unit reported one.
    pub fn take(mut self) -> Option<ProvisionError> {
        self.slot.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_report_wins() {
        let scope = CancellationToken::new();
        let (controller, first) = CancellationController::new(&scope);

        assert!(!controller.is_cancelled());
        assert!(controller.report(ProvisionError::Provider("first".into())));
        assert!(controller.is_cancelled());
        assert!(!controller.report(ProvisionError::Provider("second".into())));

        assert_eq!(first.take(), Some(ProvisionError::Provider("first".into())));
    }

    #[test]
    fn clones_share_the_slot() {
        let scope = CancellationToken::new();
        let (controller, first) = CancellationController::new(&scope);
        let other = controller.clone();

        assert!(other.report(ProvisionError::Internal("boom".into())));
        assert!(controller.is_cancelled());
        assert!(!controller.report(ProvisionError::Cancelled));
        assert_eq!(first.take(), Some(ProvisionError::Internal("boom".into())));
    }

    #[test]
    fn caller_scope_cancels_batch_without_failure() {
        let scope = CancellationToken::new();
        let (controller, first) = CancellationController::new(&scope);

        scope.cancel();
        assert!(controller.is_cancelled());
        assert_eq!(first.take(), None);
    }

    #[test]
    fn batch_cancel_does_not_touch_caller_scope() {
        let scope = CancellationToken::new();
        let (controller, _first) = CancellationController::new(&scope);

        controller.report(ProvisionError::Provider("x".into()));
        assert!(controller.is_cancelled());
        assert!(!scope.is_cancelled());
    }
}
