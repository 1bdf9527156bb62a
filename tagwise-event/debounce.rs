//! Utilities for declaring an async (usually debounced) hook

use std::time::Duration;

use futures_executor::block_on;
use tokio::{
  sync::mpsc::{
    self,
    Sender,
    error::TrySendError,
  },
  time::Instant,
};

/// Maximum time to block when sending to a full channel.
/// Keep this very short to avoid input-handler stalls - better to drop
/// a message than to freeze the field the user is typing in.
const SEND_TIMEOUT_MS: u64 = 2;

/// Async hooks provide a small framework for the engine's debounced
/// event handlers. A hook runs as a background tokio task that waits
/// for events (an enum) sent through a channel; each event may either
/// be consumed immediately or extend/replace a debounce deadline.
pub trait AsyncHook: Sync + Send + 'static + Sized {
  type Event: Sync + Send + 'static;

  /// Called immediately whenever an event is received. The returned
  /// instant (if any) becomes the new debounce deadline; returning
  /// `None` clears any pending deadline, which is how a hook cancels
  /// a stale timer when a newer qualifying event arrives.
  fn handle_event(&mut self, event: Self::Event, timeout: Option<Instant>) -> Option<Instant>;

  /// Called when the debounce deadline is reached.
  fn finish_debounce(&mut self);

  fn spawn(self) -> mpsc::Sender<Self::Event> {
    // Generous capacity: events are drained immediately, but rapid
    // typing plus pointer movement can burst.
    let (tx, rx) = mpsc::channel(256);
    // Only spawn the worker inside a runtime so unit tests that never
    // touch timers don't need one.
    if tokio::runtime::Handle::try_current().is_ok() {
      tokio::spawn(run(self, rx));
    }
    tx
  }
}

async fn run<Hook: AsyncHook>(mut hook: Hook, mut rx: mpsc::Receiver<Hook::Event>) {
  let mut deadline: Option<Instant> = None;
  loop {
    let event = if let Some(at) = deadline {
      match tokio::time::timeout_at(at, rx.recv()).await {
        Ok(event) => event,
        Err(_) => {
          // Deadline reached with no newer event: fire and go idle.
          deadline = None;
          hook.finish_debounce();
          continue;
        },
      }
    } else {
      rx.recv().await
    };
    match event {
      Some(event) => deadline = hook.handle_event(event, deadline),
      // All senders dropped; the hook retires with them.
      None => return,
    }
  }
}

/// Send an event to a hook channel, blocking only briefly if full.
///
/// Called from synchronous event-handler code. Prioritizes
/// responsiveness over delivery: try a non-blocking send first, block
/// for at most `SEND_TIMEOUT_MS` if the channel is full, then drop.
pub fn send_blocking<T>(tx: &Sender<T>, data: T) {
  match tx.try_send(data) {
    Ok(()) => {},
    Err(TrySendError::Full(data)) => {
      let _ = block_on(tx.send_timeout(data, Duration::from_millis(SEND_TIMEOUT_MS)));
    },
    Err(TrySendError::Closed(_)) => {
      log::warn!("Attempted to send to closed channel");
    },
  }
}
