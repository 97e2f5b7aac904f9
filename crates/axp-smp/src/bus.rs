//! MMIO vs RAM physical-address routing and the
//! 4096-way stripe-locked atomic PA exchange used by LL/SC commit and
//! `CALL_PAL` atomics.

use axp_types::{BusFault, MemoryBus};
use std::cell::UnsafeCell;
use std::sync::{Mutex, RwLock};

pub const STRIPE_COUNT: usize = 4096;

fn stripe_of(pa: u64) -> usize {
    (pa as usize) % STRIPE_COUNT
}

/// Guest RAM backing store. Plain reads/writes are intentionally
/// unsynchronized — the guest is expected to use memory barriers for
/// ordering; only the
/// stripe-locked exchange path serializes access, matching real
/// hardware's atomic-RMW-vs-plain-access distinction.
struct RamBacking {
    data: UnsafeCell<Box<[u8]>>,
}

// SAFETY: callers accept the same data race exposure real hardware
// gives unsynchronized loads/stores racing a concurrent store; the
// stripe locks in `PhysicalRouter` are the only path that requires
// actual mutual exclusion, and they bypass this impl's `get()`.
unsafe impl Sync for RamBacking {}

impl RamBacking {
    fn new(size: usize) -> Self {
        RamBacking {
            data: UnsafeCell::new(vec![0u8; size].into_boxed_slice()),
        }
    }

    fn len(&self) -> usize {
        // SAFETY: length is fixed at construction; reading it never
        // races with content mutation.
        unsafe { (*self.data.get()).len() }
    }

    fn read(&self, offset: usize, len: usize) -> Option<&[u8]> {
        // SAFETY: unsynchronized by design; see struct-level comment.
        let slice: &[u8] = unsafe { &*self.data.get() };
        slice.get(offset..offset + len)
    }

    fn write(&self, offset: usize, bytes: &[u8]) -> bool {
        // SAFETY: unsynchronized by design; see struct-level comment.
        let slice: &mut [u8] = unsafe { &mut *self.data.get() };
        match slice.get_mut(offset..offset + bytes.len()) {
            Some(dst) => {
                dst.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }
}

/// A memory-mapped device: width-checked, non-blocking by contract
/// handlers may not block; they must return promptly with a status.
pub trait MmioDevice: Send + Sync {
    fn read(&self, offset: u64, width: u8) -> Result<u64, BusFault>;
    fn write(&self, offset: u64, width: u8, value: u64) -> Result<(), BusFault>;
}

struct MmioRegion {
    base: u64,
    size: u64,
    device: Box<dyn MmioDevice>,
}

/// Physical address router: classifies every physical access into the
/// guest RAM region or one of a registered set of MMIO regions.
pub struct PhysicalRouter {
    ram: RamBacking,
    mmio: RwLock<Vec<MmioRegion>>,
    stripes: Vec<Mutex<()>>,
}

impl PhysicalRouter {
    pub fn new(ram_size: usize) -> Self {
        let mut stripes = Vec::with_capacity(STRIPE_COUNT);
        stripes.resize_with(STRIPE_COUNT, || Mutex::new(()));
        PhysicalRouter {
            ram: RamBacking::new(ram_size),
            mmio: RwLock::new(Vec::new()),
            stripes,
        }
    }

    pub fn register_mmio(&self, base: u64, size: u64, device: Box<dyn MmioDevice>) {
        self.mmio.write().unwrap().push(MmioRegion { base, size, device });
    }

    fn find_mmio(&self, pa: u64) -> Option<(u64, usize)> {
        let regions = self.mmio.read().unwrap();
        regions.iter().position(|r| pa >= r.base && pa < r.base + r.size).map(|idx| {
            let offset = pa - regions[idx].base;
            (offset, idx)
        })
    }

    fn mmio_read(&self, pa: u64, width: u8) -> Result<u64, BusFault> {
        let (offset, idx) = self.find_mmio(pa).ok_or_else(|| {
            tracing::debug!(pa, width, "no mmio region covers this address");
            BusFault::OutOfRange
        })?;
        let regions = self.mmio.read().unwrap();
        regions[idx].device.read(offset, width)
    }

    fn mmio_write(&self, pa: u64, width: u8, value: u64) -> Result<(), BusFault> {
        let (offset, idx) = self.find_mmio(pa).ok_or(BusFault::OutOfRange)?;
        let regions = self.mmio.read().unwrap();
        regions[idx].device.write(offset, width, value)
    }

    fn ram_read(&self, pa: u64, width: usize) -> Result<&[u8], BusFault> {
        self.ram.read(pa as usize, width).ok_or(BusFault::OutOfRange)
    }

    fn ram_write(&self, pa: u64, bytes: &[u8]) -> Result<(), BusFault> {
        if self.ram.write(pa as usize, bytes) {
            Ok(())
        } else {
            Err(BusFault::OutOfRange)
        }
    }

    fn is_ram(&self, pa: u64) -> bool {
        (pa as usize) < self.ram.len()
    }

    /// Atomic PA exchange: under the physical
    /// address's stripe lock, read the current quadword, write
    /// `new_value`, and return the old quadword. Used by the LL/SC
    /// success commit and by `CALL_PAL` atomics.
    pub fn atomic_exchange_u64(&self, pa: u64, new_value: u64) -> Result<u64, BusFault> {
        let _guard = self.stripes[stripe_of(pa)].lock().unwrap();
        let old = self.read_u64_uncontended(pa)?;
        self.write_u64_uncontended(pa, new_value)?;
        tracing::trace!(pa, new_value, old, "stripe-locked atomic exchange");
        Ok(old)
    }

    fn read_u64_uncontended(&self, pa: u64) -> Result<u64, BusFault> {
        if self.is_ram(pa) {
            let bytes: [u8; 8] = self.ram_read(pa, 8)?.try_into().unwrap();
            Ok(u64::from_le_bytes(bytes))
        } else {
            self.mmio_read(pa, 8)
        }
    }

    fn write_u64_uncontended(&self, pa: u64, value: u64) -> Result<(), BusFault> {
        if self.is_ram(pa) {
            self.ram_write(pa, &value.to_le_bytes())
        } else {
            self.mmio_write(pa, 8, value)
        }
    }
}

macro_rules! impl_read {
    ($name:ident, $ty:ty, $width:expr) => {
        pub fn $name(&self, pa: u64) -> Result<$ty, BusFault> {
            if self.is_ram(pa) {
                let bytes: [u8; $width] = self.ram_read(pa, $width)?.try_into().unwrap();
                Ok(<$ty>::from_le_bytes(bytes))
            } else {
                self.mmio_read(pa, $width as u8).map(|v| v as $ty)
            }
        }
    };
}

macro_rules! impl_write {
    ($name:ident, $ty:ty, $width:expr) => {
        pub fn $name(&self, pa: u64, value: $ty) -> Result<(), BusFault> {
            if self.is_ram(pa) {
                self.ram_write(pa, &value.to_le_bytes())
            } else {
                self.mmio_write(pa, $width as u8, value as u64)
            }
        }
    };
}

impl PhysicalRouter {
    impl_read!(read_u8_shared, u8, 1);
    impl_read!(read_u16_shared, u16, 2);
    impl_read!(read_u32_shared, u32, 4);
    impl_read!(read_u64_shared, u64, 8);

    impl_write!(write_u8_shared, u8, 1);
    impl_write!(write_u16_shared, u16, 2);
    impl_write!(write_u32_shared, u32, 4);
    impl_write!(write_u64_shared, u64, 8);
}

/// `MemoryBus` is implemented for a *shared reference* to the router,
/// not for the router itself: every CPU thread holds its own
/// `&PhysicalRouter` (or derefs a cloned `Arc<PhysicalRouter>` to one)
/// and gets `&mut dyn MemoryBus` by taking `&mut` of that local
/// reference. No exclusive access to the router is ever required, which
/// is what lets plain RAM accesses stay lock-free across CPUs while the
/// stripe locks still serialize `atomic_exchange_u64`.
impl MemoryBus for &PhysicalRouter {
    fn read_u8(&mut self, pa: u64) -> Result<u8, BusFault> {
        PhysicalRouter::read_u8_shared(*self, pa)
    }
    fn read_u16(&mut self, pa: u64) -> Result<u16, BusFault> {
        PhysicalRouter::read_u16_shared(*self, pa)
    }
    fn read_u32(&mut self, pa: u64) -> Result<u32, BusFault> {
        PhysicalRouter::read_u32_shared(*self, pa)
    }
    fn read_u64(&mut self, pa: u64) -> Result<u64, BusFault> {
        PhysicalRouter::read_u64_shared(*self, pa)
    }
    fn write_u8(&mut self, pa: u64, value: u8) -> Result<(), BusFault> {
        PhysicalRouter::write_u8_shared(*self, pa, value)
    }
    fn write_u16(&mut self, pa: u64, value: u16) -> Result<(), BusFault> {
        PhysicalRouter::write_u16_shared(*self, pa, value)
    }
    fn write_u32(&mut self, pa: u64, value: u32) -> Result<(), BusFault> {
        PhysicalRouter::write_u32_shared(*self, pa, value)
    }
    fn write_u64(&mut self, pa: u64, value: u64) -> Result<(), BusFault> {
        PhysicalRouter::write_u64_shared(*self, pa, value)
    }
}
