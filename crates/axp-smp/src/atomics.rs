//! LDx_L / STx_C glue tying the reservation table to the physical
//! router.

use crate::bus::PhysicalRouter;
use crate::reservation::ReservationTable;
use axp_types::{BusFault, CpuId};

pub struct SmpCoherence {
    pub reservations: ReservationTable,
    pub router: PhysicalRouter,
}

impl SmpCoherence {
    pub fn new(num_cpus: usize, ram_size: usize) -> Self {
        SmpCoherence {
            reservations: ReservationTable::new(num_cpus),
            router: PhysicalRouter::new(ram_size),
        }
    }

    pub fn load_locked_u32(&self, cpu: CpuId, pa: u64) -> Result<u32, BusFault> {
        let v = self.router.read_u32_shared(pa)?;
        self.reservations.load_locked(cpu, pa);
        Ok(v)
    }

    pub fn load_locked_u64(&self, cpu: CpuId, pa: u64) -> Result<u64, BusFault> {
        let v = self.router.read_u64_shared(pa)?;
        self.reservations.load_locked(cpu, pa);
        Ok(v)
    }

    /// STx_C: `Ok(true)` means the store committed (Ra = 1); `Ok(false)`
    /// means the reservation was gone and nothing was stored (Ra = 0).
    pub fn store_conditional_u32(&self, cpu: CpuId, pa: u64, value: u32) -> Result<bool, BusFault> {
        if !self.reservations.is_reserved(cpu, pa) {
            return Ok(false);
        }
        self.router.write_u32_shared(pa, value)?;
        self.reservations.invalidate_line(pa);
        Ok(true)
    }

    pub fn store_conditional_u64(&self, cpu: CpuId, pa: u64, value: u64) -> Result<bool, BusFault> {
        if !self.reservations.is_reserved(cpu, pa) {
            return Ok(false);
        }
        self.router.write_u64_shared(pa, value)?;
        self.reservations.invalidate_line(pa);
        Ok(true)
    }
}
