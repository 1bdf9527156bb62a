//! Cancelable timer plumbing for the completion engine.
//!
//! Everything time-driven in the engine (the blur-close grace period,
//! the hover-preview debounce) runs through the [`AsyncHook`] trait
//! declared here, so the synchronous state machines never own timers
//! themselves.

mod debounce;

pub use debounce::{
  AsyncHook,
  send_blocking,
};
