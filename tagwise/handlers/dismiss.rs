//! The blur grace timer.
//!
//! Closing the dropdown the instant its field blurs would race the
//! pointer: a click on a candidate row blurs the field before the
//! click lands. Blur instead schedules a close here, and the token's
//! generation decides whether the close still applies when the timer
//! fires.

use std::{
  sync::Arc,
  time::Duration,
};

use parking_lot::Mutex;
use tokio::{
  sync::mpsc,
  time::Instant,
};

use tagwise_event::{
  AsyncHook,
  send_blocking,
};

use crate::{
  handlers::preview::PreviewEvent,
  ui::dropdown::{
    BlurToken,
    DropdownState,
  },
};

/// How long a blurred dropdown stays open waiting for a click.
const BLUR_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy)]
pub enum DismissEvent {
  /// The anchor blurred; close after the grace period unless the
  /// token goes stale first.
  BlurScheduled(BlurToken),
  /// Focus came back (or a commit landed); drop the timer early.
  Cancel,
}

pub struct DismissScheduler {
  dropdown: Arc<Mutex<DropdownState>>,
  preview:  mpsc::Sender<PreviewEvent>,
  pending:  Option<BlurToken>,
}

impl DismissScheduler {
  pub fn new(dropdown: Arc<Mutex<DropdownState>>, preview: mpsc::Sender<PreviewEvent>) -> Self {
    DismissScheduler {
      dropdown,
      preview,
      pending: None,
    }
  }
}

impl AsyncHook for DismissScheduler {
  type Event = DismissEvent;

  fn handle_event(&mut self, event: DismissEvent, _timeout: Option<Instant>) -> Option<Instant> {
    match event {
      DismissEvent::BlurScheduled(token) => {
        self.pending = Some(token);
        Some(Instant::now() + BLUR_GRACE)
      },
      DismissEvent::Cancel => {
        self.pending = None;
        None
      },
    }
  }

  fn finish_debounce(&mut self) {
    let Some(token) = self.pending.take() else {
      return;
    };
    // The state machine re-checks the generation, so a token that
    // went stale between scheduling and firing is a no-op.
    let closed = self.dropdown.lock().on_blur_elapsed(token);
    if closed {
      send_blocking(&self.preview, PreviewEvent::DropdownClosed);
    }
  }
}
