//! TLB Shard Manager: a set-associative TLB bank per (CPU, realm,
//! size-class), seqlock-protected for lock-free lookup.

use axp_types::{CpuId, GranularityHint, Realm};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;

pub const BUCKETS_PER_SHARD: usize = 1024;
pub const WAYS: usize = 4;
pub const ASN_TABLE_SIZE: usize = 256;
const SIZE_CLASSES: [GranularityHint; 4] = [
    GranularityHint::Base,
    GranularityHint::Block8,
    GranularityHint::Block64,
    GranularityHint::Block512,
];

/// One resident translation. `Copy` so a seqlock reader can snapshot it
/// with a plain load instead of needing `Clone`-time synchronization.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TlbEntry {
    pub vpn: u64,
    pub pfn: u64,
    pub perm: u8,
    pub size_class: GranularityHint,
    pub global: bool,
    pub locked: bool,
    pub asn: u8,
    pub lru: u8,
    asn_generation: u32,
    global_generation: u32,
}

fn vpn_of(va: u64, size_class: GranularityHint) -> u64 {
    va >> size_class.page_shift()
}

/// One seqlock-protected bucket: `WAYS` entries, a version counter
/// (even = stable, odd = writer in progress), and an exclusive lock
/// serializing writers (seqlocks only protect readers from torn reads;
/// writers still need mutual exclusion among themselves).
struct TlbBucket {
    version: AtomicU32,
    occupancy: AtomicU8,
    ways: UnsafeCell<[Option<TlbEntry>; WAYS]>,
    write_lock: Mutex<()>,
}

// SAFETY: all access to `ways` goes through the seqlock protocol in
// `read` (optimistic snapshot, validated against `version`) or under
// `write_lock` in `write`. No other path touches the `UnsafeCell`.
unsafe impl Sync for TlbBucket {}

impl Default for TlbBucket {
    fn default() -> Self {
        TlbBucket {
            version: AtomicU32::new(0),
            occupancy: AtomicU8::new(0),
            ways: UnsafeCell::new([None; WAYS]),
            write_lock: Mutex::new(()),
        }
    }
}

impl TlbBucket {
    /// Lock-free optimistic read: retries while a writer is mid-update.
    fn read(&self) -> [Option<TlbEntry>; WAYS] {
        loop {
            let v1 = self.version.load(Ordering::Acquire);
            if v1 & 1 != 0 {
                std::hint::spin_loop();
                continue;
            }
            // SAFETY: `TlbEntry` is `Copy` and plain data; a torn read here
            // is harmless because we validate against `version` below
            // before trusting the snapshot.
            let snapshot = unsafe { *self.ways.get() };
            let v2 = self.version.load(Ordering::Acquire);
            if v1 == v2 {
                return snapshot;
            }
            std::hint::spin_loop();
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut [Option<TlbEntry>; WAYS], &AtomicU8) -> R) -> R {
        let _guard = self.write_lock.lock().unwrap();
        self.version.fetch_add(1, Ordering::AcqRel);
        // SAFETY: `write_lock` excludes all other writers; readers only
        // ever observe this region through `read`'s version-validated
        // snapshot, never a direct reference.
        let r = unsafe { f(&mut *self.ways.get(), &self.occupancy) };
        self.version.fetch_add(1, Ordering::Release);
        r
    }
}

struct TlbShard {
    buckets: Vec<TlbBucket>,
}

impl TlbShard {
    fn new() -> Self {
        let mut buckets = Vec::with_capacity(BUCKETS_PER_SHARD);
        buckets.resize_with(BUCKETS_PER_SHARD, TlbBucket::default);
        TlbShard { buckets }
    }

    fn bucket(&self, vpn: u64) -> &TlbBucket {
        &self.buckets[(vpn as usize) % BUCKETS_PER_SHARD]
    }
}

struct PerCpuTlb {
    // [realm][size_class]
    shards: [[TlbShard; 4]; 2],
    asn_generations: [AtomicU32; ASN_TABLE_SIZE],
    global_generation: AtomicU32,
}

impl PerCpuTlb {
    fn new() -> Self {
        PerCpuTlb {
            shards: [
                [
                    TlbShard::new(),
                    TlbShard::new(),
                    TlbShard::new(),
                    TlbShard::new(),
                ],
                [
                    TlbShard::new(),
                    TlbShard::new(),
                    TlbShard::new(),
                    TlbShard::new(),
                ],
            ],
            asn_generations: std::array::from_fn(|_| AtomicU32::new(0)),
            global_generation: AtomicU32::new(0),
        }
    }

    fn realm_idx(realm: Realm) -> usize {
        match realm {
            Realm::Instruction => 0,
            Realm::Data => 1,
        }
    }

    fn shard(&self, realm: Realm, size_class: GranularityHint) -> &TlbShard {
        &self.shards[Self::realm_idx(realm)][size_class.bits() as usize]
    }
}

/// A resolved TLB hit, as returned to the translator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TlbHit {
    pub pfn: u64,
    pub perm: u8,
    pub size_class: GranularityHint,
}

pub struct TlbShardManager {
    per_cpu: Vec<PerCpuTlb>,
}

impl TlbShardManager {
    pub fn new(num_cpus: usize) -> Self {
        let mut per_cpu = Vec::with_capacity(num_cpus);
        per_cpu.resize_with(num_cpus, PerCpuTlb::new);
        TlbShardManager { per_cpu }
    }

    fn cpu(&self, cpu: CpuId) -> &PerCpuTlb {
        &self.per_cpu[cpu.as_usize()]
    }

    fn entry_is_live(&self, cpu: &PerCpuTlb, entry: &TlbEntry) -> bool {
        if entry.global_generation != cpu.global_generation.load(Ordering::Acquire) {
            return false;
        }
        if entry.global {
            return true;
        }
        entry.asn_generation == cpu.asn_generations[entry.asn as usize].load(Ordering::Acquire)
    }

    /// Look up a translation. Tries only the shard for `size_class` if
    /// the caller already knows the page size; callers that don't know
    /// it ahead of time should try each size-class shard in turn (the
    /// translator does this, smallest size-class to largest, since a
    /// narrower match is always what a narrower page actually maps).
    pub fn lookup(
        &self,
        cpu: CpuId,
        realm: Realm,
        va: u64,
        asn: u8,
        size_class: GranularityHint,
    ) -> Option<TlbHit> {
        let cpu_state = self.cpu(cpu);
        let shard = cpu_state.shard(realm, size_class);
        let vpn = vpn_of(va, size_class);
        let bucket = shard.bucket(vpn);
        let snapshot = bucket.read();
        snapshot
            .into_iter()
            .flatten()
            .find(|e| {
                e.vpn == vpn
                    && e.size_class == size_class
                    && (e.global || e.asn == asn)
                    && self.entry_is_live(cpu_state, e)
            })
            .map(|e| TlbHit {
                pfn: e.pfn,
                perm: e.perm,
                size_class: e.size_class,
            })
    }

    /// Try every size-class shard for a realm, in order from the
    /// smallest page size to the largest (matches the common case of
    /// base 8 KiB pages without forcing every caller to special-case
    /// granularity hints).
    pub fn lookup_any_size(&self, cpu: CpuId, realm: Realm, va: u64, asn: u8) -> Option<TlbHit> {
        SIZE_CLASSES
            .into_iter()
            .find_map(|sc| self.lookup(cpu, realm, va, asn, sc))
    }

    pub fn insert(
        &self,
        cpu: CpuId,
        realm: Realm,
        va: u64,
        asn: u8,
        pfn: u64,
        perm: u8,
        size_class: GranularityHint,
        global: bool,
        locked: bool,
    ) {
        let cpu_state = self.cpu(cpu);
        let shard = cpu_state.shard(realm, size_class);
        let vpn = vpn_of(va, size_class);
        let bucket = shard.bucket(vpn);
        let new_entry = TlbEntry {
            vpn,
            pfn,
            perm,
            size_class,
            global,
            locked,
            asn,
            lru: 255,
            asn_generation: cpu_state.asn_generations[asn as usize].load(Ordering::Acquire),
            global_generation: cpu_state.global_generation.load(Ordering::Acquire),
        };
        bucket.write(|ways, occupancy| {
            let matching = ways.iter().position(|w| match w {
                Some(e) => e.vpn == vpn && e.size_class == size_class,
                None => false,
            });
            if let Some(idx) = matching {
                ways[idx] = Some(new_entry);
                return;
            }
            let empty = ways.iter().position(|w| w.is_none());
            if let Some(idx) = empty {
                ways[idx] = Some(new_entry);
                occupancy.fetch_or(1 << idx, Ordering::Relaxed);
                return;
            }
            // Every way occupied: evict the lowest-LRU unlocked way. If
            // every way is locked, the insert is silently dropped; locked
            // ways are reserved for critical mappings and never evicted.
            let victim = ways
                .iter()
                .enumerate()
                .filter_map(|(idx, w)| w.filter(|e| !e.locked).map(|e| (idx, e.lru)))
                .min_by_key(|&(_, lru)| lru)
                .map(|(idx, _)| idx);
            if let Some(idx) = victim {
                ways[idx] = Some(new_entry);
            }
        });
    }

    pub fn invalidate_va(&self, cpu: CpuId, realm: Realm, va: u64) {
        let cpu_state = self.cpu(cpu);
        for size_class in SIZE_CLASSES {
            let vpn = vpn_of(va, size_class);
            let shard = cpu_state.shard(realm, size_class);
            let bucket = shard.bucket(vpn);
            bucket.write(|ways, _| {
                for w in ways.iter_mut() {
                    if matches!(w, Some(e) if e.vpn == vpn && e.size_class == size_class) {
                        *w = None;
                    }
                }
            });
        }
    }

    /// Bulk-invalidate every non-global entry for `asn` without walking
    /// any bucket: bump the per-ASN generation so stale entries miss on
    /// their next lookup (see `entry_is_live`).
    pub fn invalidate_asn(&self, cpu: CpuId, asn: u8) {
        self.cpu(cpu).asn_generations[asn as usize].fetch_add(1, Ordering::AcqRel);
    }

    /// Bulk-invalidate every entry (global and non-global) for `cpu`
    /// without walking any bucket.
    pub fn invalidate_all(&self, cpu: CpuId) {
        self.cpu(cpu).global_generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn access_counter_hit(&self, cpu: CpuId, realm: Realm, va: u64, size_class: GranularityHint) {
        let cpu_state = self.cpu(cpu);
        let vpn = vpn_of(va, size_class);
        let shard = cpu_state.shard(realm, size_class);
        let bucket = shard.bucket(vpn);
        bucket.write(|ways, _| {
            for w in ways.iter_mut() {
                if let Some(e) = w {
                    if e.vpn == vpn && e.size_class == size_class {
                        e.lru = e.lru.saturating_add(1);
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mgr() -> TlbShardManager {
        TlbShardManager::new(2)
    }

    #[test]
    fn round_trip_insert_then_lookup() {
        let mgr = mgr();
        mgr.insert(
            CpuId(0),
            Realm::Data,
            0x10000,
            7,
            0x42,
            0xFF,
            GranularityHint::Base,
            false,
            false,
        );
        let hit = mgr
            .lookup(CpuId(0), Realm::Data, 0x10000, 7, GranularityHint::Base)
            .expect("expected a hit");
        assert_eq!(hit.pfn, 0x42);
        assert_eq!(hit.perm, 0xFF);
    }

    #[test]
    fn global_entry_matches_any_asn() {
        let mgr = mgr();
        mgr.insert(
            CpuId(0),
            Realm::Instruction,
            0x20000,
            3,
            0x99,
            0xFF,
            GranularityHint::Base,
            true,
            false,
        );
        assert!(mgr
            .lookup(CpuId(0), Realm::Instruction, 0x20000, 250, GranularityHint::Base)
            .is_some());
    }

    #[test]
    fn non_global_entry_requires_matching_asn() {
        let mgr = mgr();
        mgr.insert(
            CpuId(0),
            Realm::Data,
            0x30000,
            3,
            0x55,
            0xFF,
            GranularityHint::Base,
            false,
            false,
        );
        assert!(mgr
            .lookup(CpuId(0), Realm::Data, 0x30000, 4, GranularityHint::Base)
            .is_none());
    }

    #[test]
    fn invalidate_asn_misses_non_global_but_keeps_global() {
        let mgr = mgr();
        mgr.insert(
            CpuId(0),
            Realm::Data,
            0x1000,
            9,
            1,
            0xFF,
            GranularityHint::Base,
            false,
            false,
        );
        mgr.insert(
            CpuId(0),
            Realm::Data,
            0x9000,
            9,
            2,
            0xFF,
            GranularityHint::Base,
            true,
            false,
        );
        mgr.invalidate_asn(CpuId(0), 9);
        assert!(mgr
            .lookup(CpuId(0), Realm::Data, 0x1000, 9, GranularityHint::Base)
            .is_none());
        assert!(mgr
            .lookup(CpuId(0), Realm::Data, 0x9000, 9, GranularityHint::Base)
            .is_some());
    }

    #[test]
    fn invalidate_all_clears_every_entry() {
        let mgr = mgr();
        mgr.insert(
            CpuId(1),
            Realm::Data,
            0x4000,
            1,
            5,
            0xFF,
            GranularityHint::Base,
            true,
            false,
        );
        mgr.invalidate_all(CpuId(1));
        assert!(mgr
            .lookup(CpuId(1), Realm::Data, 0x4000, 1, GranularityHint::Base)
            .is_none());
    }

    #[test]
    fn locked_ways_are_never_evicted() {
        let mgr = mgr();
        // Fill all 4 ways in the same bucket, one locked.
        for i in 0..WAYS {
            mgr.insert(
                CpuId(0),
                Realm::Data,
                (i as u64) * (BUCKETS_PER_SHARD as u64) * GranularityHint::Base.page_size(),
                1,
                i as u64,
                0xFF,
                GranularityHint::Base,
                false,
                i == 0,
            );
        }
        // One more insert targeting the same bucket should evict an
        // unlocked way, not the locked one.
        mgr.insert(
            CpuId(0),
            Realm::Data,
            (WAYS as u64) * (BUCKETS_PER_SHARD as u64) * GranularityHint::Base.page_size(),
            1,
            99,
            0xFF,
            GranularityHint::Base,
            false,
            false,
        );
        assert!(mgr
            .lookup(CpuId(0), Realm::Data, 0, 1, GranularityHint::Base)
            .is_some());
    }
}
