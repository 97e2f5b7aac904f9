//! Exception / PAL delivery machinery: the bounded
//! pending-event queue, priority/masking evaluation, and the state-save
//! / PAL-exit / context-switch operations that act on it.

mod delivery;
mod priority;
pub mod queue;

pub use delivery::{DeliverOutcome, InterruptController};
pub use queue::{PendingEventQueue, MAX_EXTERNAL_INTERRUPTS, MAX_NESTED_PAL_FRAMES};
