//! Priority ordering and masking: picks at most one event to deliver
//! this recognition
//! point, respecting IPL gating and the relevant enable masks.

use crate::queue::PendingEventQueue;
use axp_types::{ColdIprBank, CurrentMode, HotIprBank, PendingEvent};

/// An event selected for delivery, tagged with where it came from so
/// the delivery code knows which queue slot to clear afterward.
pub(crate) enum Selected {
    MachineCheck,
    Reset,
    SyncFault,
    ExternalInterrupt(usize),
    Ast(usize),
    SoftwareInterrupt(usize),
}

fn ast_enabled(mode: CurrentMode, asten: u8, astsr: u8, bit: u8) -> bool {
    let mask = 1u8 << (bit & 0x7);
    (asten & mask) != 0
        && (astsr & mask) != 0
        && matches!(
            mode,
            CurrentMode::Kernel | CurrentMode::Executive | CurrentMode::Supervisor | CurrentMode::User
        )
}

/// Pick the highest-priority deliverable event, if any, without
/// mutating the queue. Rank order: machine-check, reset, synchronous
/// fault, external interrupts (IPL + EIEN gated), ASTs (IPL <= 2 +
/// ASTEN/ASTSR gated), software interrupts (IPL + SIEN gated).
pub(crate) fn select(queue: &PendingEventQueue, hot: &HotIprBank, cold: &ColdIprBank) -> Option<Selected> {
    if queue.machine_check_is_some() {
        return Some(Selected::MachineCheck);
    }
    if queue.reset_is_some() {
        return Some(Selected::Reset);
    }
    if queue.sync_fault_is_some() {
        return Some(Selected::SyncFault);
    }

    let ipl = hot.ps.ipl();

    if let Some(idx) = queue
        .external_interrupts()
        .iter()
        .position(|e| ipl < e.ipl && (cold.eien & (1u64 << (e.source_bit & 63))) != 0)
    {
        return Some(Selected::ExternalInterrupt(idx));
    }

    if ipl <= 2 {
        if let Some(idx) = queue
            .asts()
            .iter()
            .position(|e| ast_enabled(e.mode, hot.asten, hot.astsr, e.source_bit))
        {
            return Some(Selected::Ast(idx));
        }
    }

    if let Some(idx) = queue
        .software_interrupts()
        .iter()
        .position(|e| ipl < e.ipl && (cold.sien & (1u16 << (e.source_bit & 15))) != 0)
    {
        return Some(Selected::SoftwareInterrupt(idx));
    }

    None
}

/// Remove and return the selected event from its queue slot.
pub(crate) fn take(queue: &mut PendingEventQueue, selected: Selected) -> PendingEvent {
    match selected {
        Selected::MachineCheck => queue.machine_check_mut().take().expect("selected machine check"),
        Selected::Reset => queue.reset_mut().take().expect("selected reset"),
        Selected::SyncFault => queue.sync_fault_mut().take().expect("selected sync fault"),
        Selected::ExternalInterrupt(idx) => queue.external_interrupts_mut().remove(idx),
        Selected::Ast(idx) => queue.asts_mut().remove(idx),
        Selected::SoftwareInterrupt(idx) => queue.software_interrupts_mut().remove(idx),
    }
}
