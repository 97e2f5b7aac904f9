//! SMP coherence primitives: LL/SC reservations,
//! stripe-locked atomic PA exchange, MMIO/RAM routing, and memory
//! barriers.

pub mod atomics;
pub mod barrier;
pub mod bus;
pub mod reservation;

pub use atomics::SmpCoherence;
pub use barrier::{excb, mb, pal_barrier, trapb, wmb, BarrierStrength};
pub use bus::{MmioDevice, PhysicalRouter, STRIPE_COUNT};
pub use reservation::ReservationTable;
