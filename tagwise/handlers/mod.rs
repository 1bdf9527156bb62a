//! Background hooks and their channel endpoints.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{
  self,
  Sender,
  UnboundedReceiver,
};

use tagwise_event::AsyncHook;

pub mod dismiss;
pub mod preview;

use dismiss::{
  DismissEvent,
  DismissScheduler,
};
use preview::{
  PreviewCommand,
  PreviewEvent,
  PreviewScheduler,
  PreviewUrlBuilder,
};

use crate::ui::dropdown::DropdownState;

/// Channel endpoints for the spawned hooks, handed to the UI context.
pub struct Handlers {
  pub preview: Sender<PreviewEvent>,
  pub dismiss: Sender<DismissEvent>,
}

impl Handlers {
  /// Spawn both hooks onto the current runtime. Returns the endpoint
  /// bundle plus the preview command stream the shell renders.
  ///
  /// `dropdown` must be the same state handed to the UI context, so
  /// the grace timer closes the dropdown the shell actually renders.
  pub fn spawn<U: PreviewUrlBuilder>(
    dropdown: Arc<Mutex<DropdownState>>,
    urls: U,
    preview_size: (f32, f32),
    viewport: (f32, f32),
  ) -> (Self, UnboundedReceiver<PreviewCommand>) {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let preview = PreviewScheduler::new(urls, commands_tx, preview_size, viewport).spawn();
    let dismiss = DismissScheduler::new(dropdown, preview.clone()).spawn();
    (Handlers { preview, dismiss }, commands_rx)
  }
}
