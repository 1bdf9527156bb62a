//! The preview scheduler.
//!
//! Decides when the shared preview surface shows, moves, and hides.
//! Keyboard highlight changes apply immediately; pointer hover is
//! debounced so sweeping the cursor across the dropdown does not
//! flash a preview per row. When the requested preview is already
//! visible for the same key, only its position changes.

use std::time::Duration;

use tokio::{
  sync::mpsc,
  time::Instant,
};

use tagwise_event::AsyncHook;

use crate::{
  core::resolver::PreviewKey,
  ui::geometry::{
    Point,
    Rect,
    place_preview,
  },
};

/// Pointer hover settles for this long before a preview shows.
const HOVER_DEBOUNCE: Duration = Duration::from_millis(300);

/// Maps a preview key to the URL the surface should load.
pub trait PreviewUrlBuilder: Send + Sync + 'static {
  fn url(&self, key: &PreviewKey) -> String;
}

/// Builds `{base}/{kind}/{name}` endpoint URLs.
#[derive(Debug, Clone)]
pub struct EndpointPreviewUrls {
  pub base: String,
}

impl PreviewUrlBuilder for EndpointPreviewUrls {
  fn url(&self, key: &PreviewKey) -> String {
    let (segment, name) = match key {
      PreviewKey::Character(name) => ("character", name),
      PreviewKey::Lora(name) => ("lora", name),
      PreviewKey::Embedding(name) => ("embedding", name),
    };
    format!("{}/{}/{}", self.base, segment, name)
  }
}

/// What the rendering shell should do with the preview surface.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewCommand {
  Show {
    key: PreviewKey,
    url: String,
    at:  Point,
  },
  Reposition {
    at: Point,
  },
  Hide,
}

/// Input events for the scheduler.
#[derive(Debug, Clone)]
pub enum PreviewEvent {
  /// The keyboard highlight moved. `None` means the highlighted
  /// candidate has no preview (or nothing is highlighted).
  HighlightChanged {
    key: Option<PreviewKey>,
    row: Option<Rect>,
  },
  /// The pointer entered a candidate row.
  Hover {
    key: PreviewKey,
    row: Rect,
  },
  /// The pointer entered a candidate row that has no preview.
  HoverBlank,
  /// The pointer left the candidate rows.
  HoverLeft,
  /// The dropdown closed; nothing to preview.
  DropdownClosed,
}

pub struct PreviewScheduler<U: PreviewUrlBuilder> {
  urls:          U,
  commands:      mpsc::UnboundedSender<PreviewCommand>,
  preview_size:  (f32, f32),
  viewport:      (f32, f32),
  /// Key currently shown on the surface.
  visible:       Option<PreviewKey>,
  /// What the highlight implies; hover-leave reverts to this.
  highlight:     Option<(PreviewKey, Rect)>,
  /// Hover waiting out the debounce.
  pending_hover: Option<(PreviewKey, Rect)>,
}

impl<U: PreviewUrlBuilder> PreviewScheduler<U> {
  pub fn new(
    urls: U,
    commands: mpsc::UnboundedSender<PreviewCommand>,
    preview_size: (f32, f32),
    viewport: (f32, f32),
  ) -> Self {
    PreviewScheduler {
      urls,
      commands,
      preview_size,
      viewport,
      visible: None,
      highlight: None,
      pending_hover: None,
    }
  }

  fn send(&self, command: PreviewCommand) {
    if self.commands.send(command).is_err() {
      log::warn!("preview command receiver dropped");
    }
  }

  fn show(&mut self, key: PreviewKey, row: Rect) {
    let at = place_preview(&row, self.preview_size, self.viewport);
    if self.visible.as_ref() == Some(&key) {
      self.send(PreviewCommand::Reposition { at });
      return;
    }
    let url = self.urls.url(&key);
    self.visible = Some(key.clone());
    self.send(PreviewCommand::Show { key, url, at });
  }

  fn hide(&mut self) {
    if self.visible.take().is_some() {
      self.send(PreviewCommand::Hide);
    }
  }

  /// Show whatever the highlight implies, or hide.
  fn apply_highlight(&mut self) {
    match self.highlight.clone() {
      Some((key, row)) => self.show(key, row),
      None => self.hide(),
    }
  }
}

impl<U: PreviewUrlBuilder> AsyncHook for PreviewScheduler<U> {
  type Event = PreviewEvent;

  fn handle_event(&mut self, event: PreviewEvent, _timeout: Option<Instant>) -> Option<Instant> {
    match event {
      PreviewEvent::HighlightChanged { key, row } => {
        self.pending_hover = None;
        self.highlight = key.zip(row);
        self.apply_highlight();
        None
      },
      PreviewEvent::Hover { key, row } => {
        if self.visible.as_ref() == Some(&key) {
          // Same preview, new row: move it without the debounce.
          self.pending_hover = None;
          self.show(key, row);
          return None;
        }
        self.pending_hover = Some((key, row));
        Some(Instant::now() + HOVER_DEBOUNCE)
      },
      PreviewEvent::HoverBlank => {
        // Hide, but keep the highlight around so leaving the rows
        // still reverts to it.
        self.pending_hover = None;
        self.hide();
        None
      },
      PreviewEvent::HoverLeft => {
        self.pending_hover = None;
        self.apply_highlight();
        None
      },
      PreviewEvent::DropdownClosed => {
        self.pending_hover = None;
        self.highlight = None;
        self.hide();
        None
      },
    }
  }

  fn finish_debounce(&mut self) {
    if let Some((key, row)) = self.pending_hover.take() {
      self.show(key, row);
    }
  }
}
