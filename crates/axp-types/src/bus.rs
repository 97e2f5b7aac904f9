//! Physical memory bus contract. Concrete RAM-vs-MMIO routing lives in
//! `axp-smp`; `axp-mmu`'s page walker and the memory instruction
//! grains in `axp-cpu-core` only depend on this trait.

use crate::BusFault;

pub trait MemoryBus {
    fn read_u8(&mut self, pa: u64) -> Result<u8, BusFault>;
    fn read_u16(&mut self, pa: u64) -> Result<u16, BusFault>;
    fn read_u32(&mut self, pa: u64) -> Result<u32, BusFault>;
    fn read_u64(&mut self, pa: u64) -> Result<u64, BusFault>;

    fn write_u8(&mut self, pa: u64, value: u8) -> Result<(), BusFault>;
    fn write_u16(&mut self, pa: u64, value: u16) -> Result<(), BusFault>;
    fn write_u32(&mut self, pa: u64, value: u32) -> Result<(), BusFault>;
    fn write_u64(&mut self, pa: u64, value: u64) -> Result<(), BusFault>;
}

/// Minimal flat-array `MemoryBus` used by unit tests across crates: a
/// plain `Vec<u8>` with no MMIO routing or fault injection.
pub struct FlatTestBus {
    data: Vec<u8>,
}

impl FlatTestBus {
    pub fn new(size: usize) -> Self {
        FlatTestBus { data: vec![0; size] }
    }

    pub fn write_raw(&mut self, pa: u64, bytes: &[u8]) {
        let off = pa as usize;
        self.data[off..off + bytes.len()].copy_from_slice(bytes);
    }
}

impl MemoryBus for FlatTestBus {
    fn read_u8(&mut self, pa: u64) -> Result<u8, BusFault> {
        self.data.get(pa as usize).copied().ok_or(BusFault::OutOfRange)
    }

    fn read_u16(&mut self, pa: u64) -> Result<u16, BusFault> {
        let off = pa as usize;
        let bytes: [u8; 2] = self
            .data
            .get(off..off + 2)
            .ok_or(BusFault::OutOfRange)?
            .try_into()
            .unwrap();
        Ok(u16::from_le_bytes(bytes))
    }

    fn read_u32(&mut self, pa: u64) -> Result<u32, BusFault> {
        let off = pa as usize;
        let bytes: [u8; 4] = self
            .data
            .get(off..off + 4)
            .ok_or(BusFault::OutOfRange)?
            .try_into()
            .unwrap();
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_u64(&mut self, pa: u64) -> Result<u64, BusFault> {
        let off = pa as usize;
        let bytes: [u8; 8] = self
            .data
            .get(off..off + 8)
            .ok_or(BusFault::OutOfRange)?
            .try_into()
            .unwrap();
        Ok(u64::from_le_bytes(bytes))
    }

    fn write_u8(&mut self, pa: u64, value: u8) -> Result<(), BusFault> {
        *self.data.get_mut(pa as usize).ok_or(BusFault::OutOfRange)? = value;
        Ok(())
    }

    fn write_u16(&mut self, pa: u64, value: u16) -> Result<(), BusFault> {
        let off = pa as usize;
        let slot = self.data.get_mut(off..off + 2).ok_or(BusFault::OutOfRange)?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_u32(&mut self, pa: u64, value: u32) -> Result<(), BusFault> {
        let off = pa as usize;
        let slot = self.data.get_mut(off..off + 4).ok_or(BusFault::OutOfRange)?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_u64(&mut self, pa: u64, value: u64) -> Result<(), BusFault> {
        let off = pa as usize;
        let slot = self.data.get_mut(off..off + 8).ok_or(BusFault::OutOfRange)?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}
