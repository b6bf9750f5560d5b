//! Cooperative cancellation for in-flight invocations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// A cloneable token used to interrupt a running invocation.
///
/// All clones share the same state; cancelling one is observed by every
/// clone. Cancellation is permanent.
#[derive(Clone, Default)]
pub struct CancelToken {
  inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
  cancelled: AtomicBool,
  notify: Notify,
}

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  /// Signal cancellation. Calling it again has no further effect.
  pub fn cancel(&self) {
    self.inner.cancelled.store(true, Ordering::SeqCst);
    self.inner.notify.notify_waiters();
  }

  pub fn is_cancelled(&self) -> bool {
    self.inner.cancelled.load(Ordering::SeqCst)
  }

  /// Completes once the token is cancelled, immediately if it already is.
  pub async fn cancelled(&self) {
    loop {
      // Register before checking the flag so a concurrent cancel is not missed.
      let notified = self.inner.notify.notified();
      if self.is_cancelled() {
        return;
      }
      notified.await;
    }
  }
}

impl std::fmt::Debug for CancelToken {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CancelToken")
      .field("cancelled", &self.is_cancelled())
      .finish()
  }
}
