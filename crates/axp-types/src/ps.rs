//! Processor Status (PS) word: bit layout and field accessors.
//!
//! Layout (immutable contract):
//!
//! | bits  | field    |
//! |-------|----------|
//! | 61:56 | SP_ALIGN |
//! | 12:8  | IPL      |
//! | 7     | VMM      |
//! | 6     | IV       |
//! | 4:3   | CM       |
//! | 2     | IP       |
//! | 1:0   | SW       |
//!
//! All other bits are reserved and must stay zero.

use bitflags::bitflags;

bitflags! {
    /// Single-bit PS flags. Multi-bit fields (SP_ALIGN, IPL, CM, SW) are
    /// accessed through the free functions below instead, since `bitflags`
    /// models independent boolean flags, not packed integer subfields.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
    pub struct PsFlags: u64 {
        const VMM = 1 << 7;
        const IV  = 1 << 6;
        const IP  = 1 << 2;
    }
}

/// Current Mode field of PS.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum CurrentMode {
    Kernel = 0,
    Executive = 1,
    Supervisor = 2,
    User = 3,
}

impl CurrentMode {
    pub const fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            0 => CurrentMode::Kernel,
            1 => CurrentMode::Executive,
            2 => CurrentMode::Supervisor,
            _ => CurrentMode::User,
        }
    }

    pub const fn bits(self) -> u64 {
        self as u64
    }
}

const SP_ALIGN_SHIFT: u32 = 56;
const SP_ALIGN_MASK: u64 = 0x3F;
const IPL_SHIFT: u32 = 8;
const IPL_MASK: u64 = 0x1F;
const CM_SHIFT: u32 = 3;
const CM_MASK: u64 = 0b11;
const SW_SHIFT: u32 = 0;
const SW_MASK: u64 = 0b11;

/// The reserved-bits mask: everything not named in the layout above.
const RESERVED_MASK: u64 = !((SP_ALIGN_MASK << SP_ALIGN_SHIFT)
    | (IPL_MASK << IPL_SHIFT)
    | PsFlags::all().bits()
    | (CM_MASK << CM_SHIFT)
    | (SW_MASK << SW_SHIFT));

/// Processor Status word. Newtype over the raw 64-bit value so that field
/// accessors stay total and const, with hand-rolled subfield accessors
/// alongside `bitflags` single-bit sets for the independent flag bits.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default)]
pub struct Ps(u64);

impl Ps {
    pub const fn from_raw(raw: u64) -> Self {
        Ps(raw & !RESERVED_MASK)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn sp_align(self) -> u8 {
        ((self.0 >> SP_ALIGN_SHIFT) & SP_ALIGN_MASK) as u8
    }

    pub const fn with_sp_align(self, v: u8) -> Self {
        let cleared = self.0 & !(SP_ALIGN_MASK << SP_ALIGN_SHIFT);
        Ps(cleared | (((v as u64) & SP_ALIGN_MASK) << SP_ALIGN_SHIFT))
    }

    pub const fn ipl(self) -> u8 {
        ((self.0 >> IPL_SHIFT) & IPL_MASK) as u8
    }

    pub const fn with_ipl(self, v: u8) -> Self {
        let cleared = self.0 & !(IPL_MASK << IPL_SHIFT);
        Ps(cleared | (((v as u64) & IPL_MASK) << IPL_SHIFT))
    }

    pub const fn current_mode(self) -> CurrentMode {
        CurrentMode::from_bits(self.0 >> CM_SHIFT)
    }

    pub const fn with_current_mode(self, m: CurrentMode) -> Self {
        let cleared = self.0 & !(CM_MASK << CM_SHIFT);
        Ps(cleared | (m.bits() << CM_SHIFT))
    }

    pub const fn sw(self) -> u8 {
        ((self.0 >> SW_SHIFT) & SW_MASK) as u8
    }

    pub const fn with_sw(self, v: u8) -> Self {
        let cleared = self.0 & !SW_MASK;
        Ps(cleared | ((v as u64) & SW_MASK))
    }

    pub const fn flags(self) -> PsFlags {
        PsFlags::from_bits_truncate(self.0)
    }

    pub const fn with_flags(self, flags: PsFlags) -> Self {
        let cleared = self.0 & !PsFlags::all().bits();
        Ps(cleared | flags.bits())
    }

    pub fn contains(self, f: PsFlags) -> bool {
        self.flags().contains(f)
    }

    /// `WR_PS` PAL semantics: only IPL and SW may change, everything else
    /// from `self` is preserved.
    pub const fn wr_ps(self, ipl: u8, sw: u8) -> Self {
        self.with_ipl(ipl).with_sw(sw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bits_are_stripped_on_construction() {
        let ps = Ps::from_raw(u64::MAX);
        assert_eq!(ps.raw() & RESERVED_MASK, 0);
    }

    #[test]
    fn wr_ps_preserves_all_other_bits() {
        let ps = Ps::from_raw(0)
            .with_sp_align(0x2A)
            .with_current_mode(CurrentMode::Supervisor)
            .with_flags(PsFlags::VMM | PsFlags::IP)
            .with_ipl(4)
            .with_sw(1);
        let updated = ps.wr_ps(9, 3);
        assert_eq!(updated.ipl(), 9);
        assert_eq!(updated.sw(), 3);
        assert_eq!(updated.sp_align(), ps.sp_align());
        assert_eq!(updated.current_mode(), ps.current_mode());
        assert_eq!(updated.flags(), ps.flags());
    }

    #[test]
    fn field_independence() {
        // ps_set_IPL(ps_set_CM(p, c), i) == ps_set_CM(ps_set_IPL(p, i), c)
        let p = Ps::from_raw(0x1234);
        let c = CurrentMode::User;
        let i = 17u8;
        let a = p.with_current_mode(c).with_ipl(i);
        let b = p.with_ipl(i).with_current_mode(c);
        assert_eq!(a, b);
    }
}
