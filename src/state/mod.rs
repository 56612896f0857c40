//! State owned jointly by the UI and the scheduler.
//!
//! - **SelectionQueue**: tabs awaiting a fetch, in selection order
//! - **ErrorLedger**: item-level failures, dismissible one tab at a time
//! - **DrainContext**: the shared handle wrapping both, plus fetch mode,
//!   active league, and a generation counter bumped on every reset

mod context;
mod ledger;
mod queue;

pub use context::{DrainContext, FetchTicket};
pub use ledger::{ErrorLedger, LedgerEntry};
pub use queue::SelectionQueue;
