//! TEAM_500: Free-running cycle counter.
//!
//! 32 bits, one tick per CPU cycle, wraps silently. Cores without a counter
//! read 0. Good enough for coarse profiling; no accuracy is promised across
//! idle states.

use crate::isa::CycleHardware;

/// A source of cycle counts.
pub trait CycleCounter {
    /// Current count.
    fn read() -> u32;
    /// Start counting without resetting the count.
    fn enable();
    /// Whether the hardware exists on this core.
    fn is_present() -> bool;
}

/// PMU `PMCCNTR`.
#[cfg(any(los_host, los_cycle = "pmu"))]
pub struct Pmu;

#[cfg(any(los_host, los_cycle = "pmu"))]
impl CycleCounter for Pmu {
    #[inline(always)]
    fn read() -> u32 {
        crate::cpu::read_pmccntr()
    }

    fn enable() {
        use crate::cpu::{self, PMCNTENSET_CYCLE, PmcrFlags};

        // SAFETY: only the enable bits are set; no counter is reset
        unsafe {
            cpu::write_pmcr(cpu::read_pmcr() | PmcrFlags::ENABLE);
            cpu::write_pmcntenset(PMCNTENSET_CYCLE);
        }
    }

    fn is_present() -> bool {
        true
    }
}

/// DWT `CYCCNT` on M-profile cores.
#[cfg(any(los_host, los_cycle = "dwt"))]
pub struct Dwt;

#[cfg(any(los_host, los_cycle = "dwt"))]
impl CycleCounter for Dwt {
    #[inline(always)]
    fn read() -> u32 {
        crate::cpu::read_dwt_cyccnt()
    }

    fn enable() {
        if crate::cpu::dwt_has_cyccnt() {
            // SAFETY: enabling trace and CYCCNTENA has no other effect
            unsafe { crate::cpu::enable_dwt_cyccnt() };
        }
    }

    fn is_present() -> bool {
        crate::cpu::dwt_has_cyccnt()
    }
}

/// No counter hardware.
pub struct Absent;

impl CycleCounter for Absent {
    #[inline(always)]
    fn read() -> u32 {
        0
    }

    fn enable() {}

    fn is_present() -> bool {
        false
    }
}

/// Counter chosen for this build.
#[cfg(los_cycle = "pmu")]
pub type Selected = Pmu;
#[cfg(los_cycle = "dwt")]
pub type Selected = Dwt;
#[cfg(los_cycle = "absent")]
pub type Selected = Absent;

/// Hardware behind [`Selected`].
#[cfg(los_cycle = "pmu")]
pub const HARDWARE: CycleHardware = CycleHardware::Pmu;
#[cfg(los_cycle = "dwt")]
pub const HARDWARE: CycleHardware = CycleHardware::Dwt;
#[cfg(los_cycle = "absent")]
pub const HARDWARE: CycleHardware = CycleHardware::Absent;

/// Current cycle count, or 0 without counter hardware.
#[inline(always)]
pub fn read() -> u32 {
    Selected::read()
}

/// Switch the counter on. Idempotent.
pub fn enable() {
    Selected::enable();
}

/// Whether this build has cycle counter hardware.
pub fn is_present() -> bool {
    Selected::is_present()
}

/// Cycles from `start` to `end`, allowing for one wraparound.
#[inline(always)]
pub const fn elapsed(start: u32, end: u32) -> u32 {
    end.wrapping_sub(start)
}
