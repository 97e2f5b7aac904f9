//! Bounded per-CPU pending-event queues. Nothing constrains these
//! depths architecturally, but an emulator core cannot grow an unbounded allocation in
//! response to a misbehaving or malicious guest.

use axp_types::PendingEvent;

/// Hard caps on external-interrupt backlog and nested PAL-frame depth,
/// so a misbehaving guest can't grow these queues without bound.
pub const MAX_EXTERNAL_INTERRUPTS: usize = 64;
pub const MAX_NESTED_PAL_FRAMES: usize = 32;

/// One CPU's outstanding events, split by the priority classes that
/// can have more than one instance pending at once. Machine-check,
/// reset, and the synchronous fault of the instruction in retirement are
/// each single-slot: only one can be outstanding at a time by
/// construction, so they're plain `Option`s rather than queues.
#[derive(Default)]
pub struct PendingEventQueue {
    machine_check: Option<PendingEvent>,
    reset: Option<PendingEvent>,
    sync_fault: Option<PendingEvent>,
    external_interrupts: Vec<PendingEvent>,
    dropped_external_interrupts: u64,
    asts: Vec<PendingEvent>,
    software_interrupts: Vec<PendingEvent>,
    /// Nested PAL-entry depth since the last exit back to the
    /// outermost frame; bounds recursive fault delivery (e.g. a fault
    /// raised while already inside PAL handling a fault).
    frame_depth: usize,
    dropped_frames: u64,
}

impl PendingEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise_machine_check(&mut self, event: PendingEvent) {
        self.machine_check = Some(event);
    }

    pub fn raise_reset(&mut self, event: PendingEvent) {
        self.reset = Some(event);
    }

    pub fn raise_sync_fault(&mut self, event: PendingEvent) {
        self.sync_fault = Some(event);
    }

    /// Queue an external interrupt, dropping it (and counting the drop)
    /// if the queue is already at `MAX_EXTERNAL_INTERRUPTS`.
    pub fn raise_external_interrupt(&mut self, event: PendingEvent) {
        if self.external_interrupts.len() >= MAX_EXTERNAL_INTERRUPTS {
            self.dropped_external_interrupts += 1;
            return;
        }
        self.external_interrupts.push(event);
    }

    pub fn raise_ast(&mut self, event: PendingEvent) {
        self.asts.push(event);
    }

    pub fn raise_software_interrupt(&mut self, event: PendingEvent) {
        self.software_interrupts.push(event);
    }

    pub fn external_interrupts(&self) -> &[PendingEvent] {
        &self.external_interrupts
    }

    pub fn dropped_external_interrupts(&self) -> u64 {
        self.dropped_external_interrupts
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    pub fn frame_depth(&self) -> usize {
        self.frame_depth
    }

    pub(crate) fn machine_check_is_some(&self) -> bool {
        self.machine_check.is_some()
    }

    pub(crate) fn reset_is_some(&self) -> bool {
        self.reset.is_some()
    }

    pub(crate) fn sync_fault_is_some(&self) -> bool {
        self.sync_fault.is_some()
    }

    pub(crate) fn machine_check_mut(&mut self) -> &mut Option<PendingEvent> {
        &mut self.machine_check
    }

    pub(crate) fn reset_mut(&mut self) -> &mut Option<PendingEvent> {
        &mut self.reset
    }

    pub(crate) fn sync_fault_mut(&mut self) -> &mut Option<PendingEvent> {
        &mut self.sync_fault
    }

    pub(crate) fn external_interrupts_mut(&mut self) -> &mut Vec<PendingEvent> {
        &mut self.external_interrupts
    }

    pub(crate) fn asts_mut(&mut self) -> &mut Vec<PendingEvent> {
        &mut self.asts
    }

    pub(crate) fn asts(&self) -> &[PendingEvent] {
        &self.asts
    }

    pub(crate) fn software_interrupts_mut(&mut self) -> &mut Vec<PendingEvent> {
        &mut self.software_interrupts
    }

    pub(crate) fn software_interrupts(&self) -> &[PendingEvent] {
        &self.software_interrupts
    }

    /// Enter one more PAL frame. Returns `false` (fail closed) if this
    /// would exceed `MAX_NESTED_PAL_FRAMES`; the caller must not proceed
    /// with state-save in that case.
    pub(crate) fn try_enter_frame(&mut self) -> bool {
        if self.frame_depth >= MAX_NESTED_PAL_FRAMES {
            self.dropped_frames += 1;
            return false;
        }
        self.frame_depth += 1;
        true
    }

    pub(crate) fn exit_frame(&mut self) {
        self.frame_depth = self.frame_depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axp_types::{CurrentMode, ExceptionClass};

    fn dummy_event() -> PendingEvent {
        PendingEvent::exception(ExceptionClass::HardwareInterrupt, 0, CurrentMode::Kernel)
    }

    #[test]
    fn external_interrupt_queue_is_bounded_and_counts_drops() {
        let mut q = PendingEventQueue::new();
        for _ in 0..MAX_EXTERNAL_INTERRUPTS {
            q.raise_external_interrupt(dummy_event());
        }
        assert_eq!(q.external_interrupts().len(), MAX_EXTERNAL_INTERRUPTS);
        assert_eq!(q.dropped_external_interrupts(), 0);

        let extra = 10_000;
        for _ in 0..extra {
            q.raise_external_interrupt(dummy_event());
        }
        assert_eq!(q.external_interrupts().len(), MAX_EXTERNAL_INTERRUPTS);
        assert_eq!(q.dropped_external_interrupts(), extra as u64);
    }

    #[test]
    fn frame_depth_cap_fails_closed() {
        let mut q = PendingEventQueue::new();
        for _ in 0..MAX_NESTED_PAL_FRAMES {
            assert!(q.try_enter_frame());
        }
        assert!(!q.try_enter_frame());
        assert_eq!(q.dropped_frames(), 1);
    }
}
