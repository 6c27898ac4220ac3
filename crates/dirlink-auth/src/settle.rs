//! Single-settlement results
//!
//! A directory request can report completion from more than one place: the
//! operation itself, the connection driver failing underneath it, or a
//! search that yields several entries for one filter. A [`Settlement`] lets
//! all of them race; the first value wins and every later one is dropped.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::DirectoryError;

/// Create a linked settlement and the pending result it resolves
pub fn settlement<T>() -> (Settlement<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Settlement {
            slot: Arc::new(Mutex::new(Some(tx))),
        },
        Pending { rx },
    )
}

/// Write side. Cheap to clone; all clones share one slot.
pub struct Settlement<T> {
    slot: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Settlement<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Settlement<T> {
    /// Settle with `value`. Returns `false` if an earlier call already
    /// settled, in which case `value` is discarded.
    pub fn settle(&self, value: T) -> bool {
        match self.slot.lock().take() {
            Some(tx) => {
                // the waiter may have given up already; the slot is spent either way
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }
}

/// Read side, resolved by the first settle
pub struct Pending<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Pending<T> {
    /// Wait up to `limit` for the first settled value
    pub async fn wait(self, limit: Duration) -> Result<T, DirectoryError> {
        match tokio::time::timeout(limit, self.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(DirectoryError::Abandoned),
            Err(_) => Err(DirectoryError::Timeout(limit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_first_write_wins() {
        let (settle, pending) = settlement();

        assert!(settle.settle("first"));
        assert!(!settle.settle("second"));

        assert_eq!(pending.wait(LIMIT).await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_clones_share_the_slot() {
        let (settle, pending) = settlement();
        let other = settle.clone();

        let handle = tokio::spawn(async move { other.settle(1) });
        assert!(handle.await.unwrap());
        assert!(!settle.settle(2));

        assert_eq!(pending.wait(LIMIT).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dropped_without_settling() {
        let (settle, pending) = settlement::<u8>();
        drop(settle);

        assert_eq!(pending.wait(LIMIT).await, Err(DirectoryError::Abandoned));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let (_settle, pending) = settlement::<u8>();

        let err = pending.wait(Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err, DirectoryError::Timeout(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_settle_after_waiter_gave_up() {
        let (settle, pending) = settlement::<u8>();
        drop(pending);

        assert!(settle.settle(1));
        assert!(!settle.settle(2));
    }
}
