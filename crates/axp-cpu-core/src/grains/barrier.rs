//! Barrier grains: `TRAPB`/`EXCB`/`MB`/`WMB`/`FETCH`/`FETCH_M`/`ECB`/`RS`
//! These execute at MEM and stall the
//! stage until every older access has drained, per `BarrierStrength`
//! ordering (axp-smp).

use axp_cpu_decoder::opcode::misc;
use axp_smp::{excb, mb, trapb, wmb, BarrierStrength};

/// Classify a `MISC`-opcode function code into the barrier it issues.
/// Functions with no ordering effect on this model (`FETCH`/`FETCH_M`/
/// `ECB`/`RS`/`RPCC`/`WH64`) return `None`: they're cache/prefetch hints
/// the interpreter can treat as no-ops.
pub fn classify(function: u32) -> Option<BarrierStrength> {
    match function {
        misc::TRAPB => Some(BarrierStrength::Trapb),
        misc::EXCB => Some(BarrierStrength::Excb),
        misc::MB => Some(BarrierStrength::Mb),
        misc::WMB => Some(BarrierStrength::Wmb),
        _ => None,
    }
}

/// Issue the fence matching `strength`. The pipeline stalls MEM for one
/// cycle around this call so every slot already past MEM has retired
/// before the barrier's own ordering guarantee takes effect.
pub fn execute(strength: BarrierStrength) {
    match strength {
        BarrierStrength::Trapb => trapb(),
        BarrierStrength::Excb => excb(),
        BarrierStrength::Wmb => wmb(),
        BarrierStrength::Mb => mb(),
        BarrierStrength::Pal => axp_smp::pal_barrier(),
    }
}
