//! Domain types for tabfetch
//!
//! - TabRef: a selected stash tab (id + display name)
//! - FetchMode / Payload: which provider call is made and what it returned
//! - DrainEvent: everything emitted to the UI layer

pub mod event;
pub mod item;

pub use event::{DrainEvent, EventSink};
pub use item::{FetchMode, FetchResult, Payload, PreviewTarget, TabRef};
