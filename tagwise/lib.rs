//! Inline type-ahead completion for prompt fields.
//!
//! The engine completes three syntaxes inside a comma-separated
//! prompt: plain tags, `<lora:...>` references, and `embedding:`
//! references. It is headless: a rendering shell feeds it field
//! events through [`ui::CompletionUiContext`] and renders whatever
//! state comes back.
//!
//! Layering, bottom to top:
//! - [`core`]: pure context detection, candidate resolution, text
//!   splicing, and weight adjustment.
//! - [`loader`]: source files to an atomically swappable snapshot.
//! - [`handlers`]: debounced preview scheduling and the blur grace
//!   timer, built on [`tagwise_event::AsyncHook`].
//! - [`ui`]: the per-window wiring that ties it all together.

pub mod config;
pub mod core;
pub mod handlers;
pub mod loader;
pub mod ui;
