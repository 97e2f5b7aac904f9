//! Memory barrier primitives. These emulate
//! architectural fences over host memory: the guest's RAM accesses are
//! intentionally unsynchronized by default, so a host `fence` is the
//! practical mechanism for giving the emulator's own threads the
//! ordering real hardware would give the guest across these points.

use std::sync::atomic::{fence, Ordering};

/// Strength ordering, weakest to strongest (used by tests/assertions
/// that need to compare two barrier kinds; the pipeline itself just
/// calls the specific barrier it decoded).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum BarrierStrength {
    Wmb,
    Trapb,
    Excb,
    Mb,
    Pal,
}

/// `WMB`: store-store fence. Prior stores are drained; loads may bypass.
pub fn wmb() {
    fence(Ordering::Release);
}

/// `MB` / `MB2`: full fence. Stalls until prior loads and stores are
/// complete and globally ordered.
pub fn mb() {
    fence(Ordering::SeqCst);
}

/// `TRAPB`: synchronizes arithmetic trap delivery. Callers must also
/// force pending-arithmetic-event recognition before continuing; the
/// fence alone only gives the memory-ordering half of the contract.
pub fn trapb() {
    fence(Ordering::SeqCst);
}

/// `EXCB`: synchronizes general exception state (`EXC_ADDR`/`EXC_SUM`
/// reflect only completed instructions after this point).
pub fn excb() {
    fence(Ordering::SeqCst);
}

/// Internal PAL barrier: strongest available — `MB` + `EXCB` plus a
/// full pipeline flush. The flush itself is the caller's
/// responsibility (it's a pipeline-executor concern, not a bus one);
/// this just issues the fence half.
pub fn pal_barrier() {
    mb();
    excb();
}
