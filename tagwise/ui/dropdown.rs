//! The dropdown selection state machine.
//!
//! Owns "which dropdown is open, which candidate is highlighted" and
//! nothing else. Candidate sets are only ever replaced on the
//! text-changed transition; every other event moves the highlight or
//! terminates the state. The machine is fully synchronous - the blur
//! grace period is expressed as generation tokens so the timer can
//! live elsewhere.

use crate::{
  core::{
    context::CompletionContext,
    resolver::RankedCandidate,
  },
  ui::InputId,
};

/// Keys the dropdown may react to while open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropdownKey {
  ArrowDown,
  ArrowUp,
  Enter,
  Tab,
  Escape,
}

/// What the caller should do with the key event.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
  /// Not ours; let the input field handle it normally.
  Ignored,
  /// Swallow the key; the dropdown state changed.
  Consumed,
  /// Swallow the key and run the insertion engine with this request.
  /// The dropdown is already closed when this is returned.
  Commit(CommitRequest),
}

/// Everything the insertion engine needs to splice the chosen value.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
  pub anchor:    InputId,
  pub context:   CompletionContext,
  pub candidate: RankedCandidate,
}

/// Token identifying one scheduled blur-close. A token only closes
/// the dropdown if no newer qualifying event bumped the generation in
/// the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurToken {
  pub anchor:     InputId,
  pub generation: u64,
}

#[derive(Debug)]
struct OpenDropdown {
  anchor:     InputId,
  context:    CompletionContext,
  candidates: Vec<RankedCandidate>,
  /// `None` means no highlight; movement keys then start at the top.
  highlight:  Option<usize>,
}

/// Closed, or Open with a non-empty candidate list.
#[derive(Debug, Default)]
pub struct DropdownState {
  open:            Option<OpenDropdown>,
  blur_generation: u64,
}

impl DropdownState {
  pub fn is_open(&self) -> bool {
    self.open.is_some()
  }

  pub fn anchor(&self) -> Option<InputId> {
    self.open.as_ref().map(|open| open.anchor)
  }

  pub fn candidates(&self) -> &[RankedCandidate] {
    self.open.as_ref().map_or(&[], |open| &open.candidates)
  }

  pub fn highlight(&self) -> Option<usize> {
    self.open.as_ref().and_then(|open| open.highlight)
  }

  pub fn highlighted_candidate(&self) -> Option<&RankedCandidate> {
    let open = self.open.as_ref()?;
    open.candidates.get(open.highlight?)
  }

  /// Text-changed transition: the only place the candidate set
  /// mutates. Empty candidates (or no context) close the dropdown.
  pub fn on_text_changed(
    &mut self,
    anchor: InputId,
    context: Option<CompletionContext>,
    candidates: Vec<RankedCandidate>,
  ) {
    match context {
      Some(context) if !candidates.is_empty() => {
        self.open = Some(OpenDropdown {
          anchor,
          context,
          candidates,
          highlight: Some(0),
        });
      },
      _ => self.close(),
    }
  }

  /// Keyboard transition. Only consumes keys when the state machine
  /// actually acted on them, so an idle field keeps its default
  /// Enter/Tab behavior.
  pub fn on_key(&mut self, key: DropdownKey) -> KeyOutcome {
    if self.open.is_none() {
      return KeyOutcome::Ignored;
    }

    match key {
      DropdownKey::ArrowDown => {
        if let Some(open) = self.open.as_mut() {
          let last = open.candidates.len() - 1;
          open.highlight = Some(open.highlight.map_or(0, |h| (h + 1).min(last)));
        }
        KeyOutcome::Consumed
      },
      DropdownKey::ArrowUp => {
        if let Some(open) = self.open.as_mut() {
          open.highlight = Some(open.highlight.map_or(0, |h| h.saturating_sub(1)));
        }
        KeyOutcome::Consumed
      },
      DropdownKey::Enter | DropdownKey::Tab => {
        match self.highlight() {
          Some(index) => {
            self
              .commit(index)
              .map_or(KeyOutcome::Ignored, KeyOutcome::Commit)
          },
          // No highlight: the key keeps its default behavior.
          None => KeyOutcome::Ignored,
        }
      },
      DropdownKey::Escape => {
        self.close();
        KeyOutcome::Consumed
      },
    }
  }

  /// Pointer click on a rendered candidate row: same as Enter on that
  /// index.
  pub fn on_candidate_click(&mut self, index: usize) -> Option<CommitRequest> {
    self.commit(index)
  }

  /// The anchor lost focus. Returns the token to hand to the grace
  /// timer, or `None` when there is nothing to close.
  pub fn on_blur(&mut self, anchor: InputId) -> Option<BlurToken> {
    let open = self.open.as_ref()?;
    if open.anchor != anchor {
      return None;
    }
    self.blur_generation += 1;
    Some(BlurToken {
      anchor,
      generation: self.blur_generation,
    })
  }

  /// The anchor regained focus before the grace timer fired; any
  /// outstanding token is now stale.
  pub fn on_focus_regained(&mut self, anchor: InputId) {
    if self.anchor() == Some(anchor) {
      self.blur_generation += 1;
    }
  }

  /// Grace timer fired. Closes only if the token is still current.
  pub fn on_blur_elapsed(&mut self, token: BlurToken) -> bool {
    let still_current =
      self.anchor() == Some(token.anchor) && token.generation == self.blur_generation;
    if still_current {
      self.close();
    }
    still_current
  }

  /// Click landed outside both the anchor and the dropdown surface.
  pub fn on_outside_click(&mut self) {
    self.close();
  }

  pub fn close(&mut self) {
    self.open = None;
  }

  fn commit(&mut self, index: usize) -> Option<CommitRequest> {
    let open = self.open.as_ref()?;
    let candidate = open.candidates.get(index)?.clone();
    let request = CommitRequest {
      anchor: open.anchor,
      context: open.context.clone(),
      candidate,
    };
    // Commit invalidates any pending blur-close along with the state.
    self.blur_generation += 1;
    self.close();
    Some(request)
  }
}
