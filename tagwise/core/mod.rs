//! The synchronous completion core: pure data and pure functions.
//!
//! Nothing in here owns a timer, a task, or a surface. Everything is
//! testable from `(text, cursor)` pairs and in-memory source lists.

pub mod context;
pub mod dictionary;
pub mod insert;
pub mod resolver;
pub mod weight;
