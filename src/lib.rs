//! tabfetch - rate-limited stash tab fetching
//!
//! Drains a user-selected queue of stash tabs one at a time against a remote
//! API that enforces two independent request windows, collecting per-tab
//! failures without aborting the batch.

pub mod domain;
pub mod error;
pub mod provider;
pub mod scheduler;
pub mod state;

pub use error::{Result, TabfetchError};
