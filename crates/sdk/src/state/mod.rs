//! In-memory cache of indexed tokens.
//!
//! [`TokensState`] holds two independently tracked collections, all tokens
//! and search results, and changes only through [`Action`]s applied by
//! [`TokensState::reduce`]. [`Store`] wraps it into a shared container that
//! serializes dispatches and notifies subscribers.

mod reducer;
mod store;

pub use reducer::*;
pub use store::*;
