//! Per-window completion wiring.
//!
//! [`CompletionUiContext`] is the seam between the rendering shell and
//! the engine: the shell reports field events (edits, keys, focus,
//! pointer) in character offsets, and gets back the state to render
//! plus the occasional text splice to apply.

use std::{
  collections::HashMap,
  sync::Arc,
};

use parking_lot::Mutex;
use slotmap::SlotMap;

use tagwise_event::send_blocking;

use crate::{
  config::Preferences,
  core::{
    context::detect_context,
    insert::{
      Insertion,
      commit_candidate,
    },
    resolver::{
      RankedCandidate,
      ResolveOptions,
      resolve_candidates,
    },
  },
  handlers::{
    Handlers,
    dismiss::DismissEvent,
    preview::PreviewEvent,
  },
  loader::SharedSources,
};

pub mod dropdown;
pub mod geometry;

use dropdown::{
  CommitRequest,
  DropdownKey,
  DropdownState,
  KeyOutcome,
};
use geometry::Rect;

slotmap::new_key_type! {
  /// Stable identity of an attached input field.
  pub struct InputId;
}

/// What the shell should do after forwarding a key.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineKeyResult {
  /// Not ours; the field keeps its default key behavior.
  Ignored,
  /// Swallow the key; re-render the dropdown.
  Consumed,
  /// Swallow the key and apply this splice to the field.
  Committed(Insertion),
}

#[derive(Debug)]
struct InputState {
  /// Preference snapshot taken at attach time. A reloaded config
  /// applies to fields attached afterwards.
  preferences: Preferences,
}

pub struct CompletionUiContext {
  sources:  SharedSources,
  handlers: Handlers,
  inputs:   SlotMap<InputId, InputState>,
  /// Shell-assigned field names to their ids, so re-attaching an
  /// already wired field is a no-op.
  named:    HashMap<String, InputId>,
  dropdown: Arc<Mutex<DropdownState>>,
}

impl CompletionUiContext {
  /// `dropdown` is shared with the dismiss hook so the grace timer
  /// can close it directly.
  pub fn new(sources: SharedSources, handlers: Handlers, dropdown: Arc<Mutex<DropdownState>>) -> Self {
    CompletionUiContext {
      sources,
      handlers,
      inputs: SlotMap::with_key(),
      named: HashMap::new(),
      dropdown,
    }
  }

  /// Register a prompt field. The shell keeps the returned id and
  /// reuses it.
  pub fn attach(&mut self, preferences: Preferences) -> InputId {
    self.inputs.insert(InputState { preferences })
  }

  /// Register a field under a shell-assigned name. Attaching an
  /// already wired name returns its existing id untouched, so shells
  /// that re-scan their fields can call this blindly.
  pub fn attach_named(&mut self, name: &str, preferences: Preferences) -> InputId {
    if let Some(&input) = self.named.get(name) {
      return input;
    }
    let input = self.attach(preferences);
    self.named.insert(name.to_string(), input);
    input
  }

  pub fn detach(&mut self, input: InputId) {
    if self.inputs.remove(input).is_some() {
      self.named.retain(|_, id| *id != input);
      if self.dropdown.lock().anchor() == Some(input) {
        self.close_dropdown();
      }
    }
  }

  pub fn is_attached(&self, input: InputId) -> bool {
    self.inputs.contains_key(input)
  }

  fn resolve_options(&self, input: InputId) -> ResolveOptions {
    self
      .inputs
      .get(input)
      .map(|state| {
        ResolveOptions {
          hide_aliases_with_main: state.preferences.hide_aliases_with_main,
          presets_first:          state.preferences.presets_first,
        }
      })
      .unwrap_or_default()
  }

  /// The field's text or cursor changed. Re-detects the context,
  /// resolves candidates against the current source snapshot, and
  /// returns the candidate list to render (empty means closed).
  pub fn on_text_changed(&mut self, input: InputId, text: &str, cursor: usize) -> Vec<RankedCandidate> {
    if !self.inputs.contains_key(input) {
      return Vec::new();
    }

    let context = detect_context(text, cursor);
    let candidates = match &context {
      Some(context) => {
        let sources = self.sources.load();
        resolve_candidates(
          context,
          &sources.dictionary,
          &sources.loras,
          &sources.embeddings,
          self.resolve_options(input),
        )
      },
      None => Vec::new(),
    };

    let mut dropdown = self.dropdown.lock();
    let was_open = dropdown.is_open();
    dropdown.on_text_changed(input, context, candidates.clone());
    let closed = was_open && !dropdown.is_open();
    drop(dropdown);

    if closed {
      send_blocking(&self.handlers.preview, PreviewEvent::DropdownClosed);
    }
    candidates
  }

  /// Forward a key the dropdown might care about.
  pub fn on_key(&mut self, input: InputId, key: DropdownKey, text: &str, cursor: usize) -> EngineKeyResult {
    if self.dropdown.lock().anchor() != Some(input) {
      return EngineKeyResult::Ignored;
    }

    let outcome = self.dropdown.lock().on_key(key);
    match outcome {
      KeyOutcome::Ignored => EngineKeyResult::Ignored,
      KeyOutcome::Consumed => EngineKeyResult::Consumed,
      KeyOutcome::Commit(request) => {
        match self.apply_commit(&request, text, cursor) {
          Some(insertion) => EngineKeyResult::Committed(insertion),
          // Text moved under the dropdown; it already closed, so the
          // key is simply swallowed.
          None => EngineKeyResult::Consumed,
        }
      },
    }
  }

  /// Pointer click on candidate row `index`.
  pub fn on_candidate_click(&mut self, index: usize, text: &str, cursor: usize) -> Option<Insertion> {
    let request = self.dropdown.lock().on_candidate_click(index)?;
    self.apply_commit(&request, text, cursor)
  }

  /// The field lost focus; start the grace timer.
  pub fn on_blur(&mut self, input: InputId) {
    if let Some(token) = self.dropdown.lock().on_blur(input) {
      send_blocking(&self.handlers.dismiss, DismissEvent::BlurScheduled(token));
    }
  }

  /// The field regained focus before the grace timer fired.
  pub fn on_focus(&mut self, input: InputId) {
    self.dropdown.lock().on_focus_regained(input);
    send_blocking(&self.handlers.dismiss, DismissEvent::Cancel);
  }

  /// Click landed outside the field and the dropdown surface.
  pub fn on_outside_click(&mut self) {
    let was_open = self.dropdown.lock().is_open();
    self.dropdown.lock().on_outside_click();
    if was_open {
      send_blocking(&self.handlers.preview, PreviewEvent::DropdownClosed);
    }
  }

  pub fn candidates(&self) -> Vec<RankedCandidate> {
    self.dropdown.lock().candidates().to_vec()
  }

  pub fn highlight(&self) -> Option<usize> {
    self.dropdown.lock().highlight()
  }

  /// The shell rendered the dropdown and knows where the highlighted
  /// row sits; tell the preview scheduler about it.
  pub fn notify_highlight(&self, row: Rect) {
    let key = self.dropdown.lock().highlighted_candidate().and_then(|c| c.preview.clone());
    send_blocking(&self.handlers.preview, PreviewEvent::HighlightChanged {
      row: key.is_some().then_some(row),
      key,
    });
  }

  /// The pointer entered candidate row `index`.
  pub fn notify_hover(&self, index: usize, row: Rect) {
    let key = self
      .dropdown
      .lock()
      .candidates()
      .get(index)
      .and_then(|c| c.preview.clone());
    let event = match key {
      Some(key) => PreviewEvent::Hover { key, row },
      None => PreviewEvent::HoverBlank,
    };
    send_blocking(&self.handlers.preview, event);
  }

  /// The pointer left the candidate rows.
  pub fn notify_hover_left(&self) {
    send_blocking(&self.handlers.preview, PreviewEvent::HoverLeft);
  }

  fn close_dropdown(&self) {
    self.dropdown.lock().close();
    send_blocking(&self.handlers.preview, PreviewEvent::DropdownClosed);
  }

  fn apply_commit(&self, request: &CommitRequest, text: &str, cursor: usize) -> Option<Insertion> {
    send_blocking(&self.handlers.dismiss, DismissEvent::Cancel);
    send_blocking(&self.handlers.preview, PreviewEvent::DropdownClosed);

    let insert_comma = self
      .inputs
      .get(request.anchor)
      .is_none_or(|state| state.preferences.insert_comma);
    commit_candidate(
      text,
      cursor,
      &request.context,
      &request.candidate.insert_value,
      insert_comma,
    )
  }
}
