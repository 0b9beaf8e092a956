//! TEAM_500: AArch32 system-register access.
//!
//! Only the registers this crate needs: CPSR (mask bits), TPIDRPRW, the PMU
//! cycle counter and the M-profile DWT counter. Each accessor exists only in
//! builds whose ISA row uses it, so no build ever carries an encoding its
//! core lacks. On non-ARM hosts every register is a thread-local cell; each
//! host thread behaves as its own core.

use bitflags::bitflags;

bitflags! {
    /// Mask and state bits of the CPSR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PsrFlags: u32 {
        /// Executing in Thumb state.
        const THUMB = 1 << 5;
        /// FIQ (fast interrupt) masked.
        const FIQ_MASK = 1 << 6;
        /// IRQ (normal interrupt) masked.
        const IRQ_MASK = 1 << 7;
        /// Asynchronous abort masked.
        const ABORT_MASK = 1 << 8;
    }
}

bitflags! {
    /// Performance monitor control register (PMCR).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PmcrFlags: u32 {
        /// All counters enabled.
        const ENABLE = 1 << 0;
        /// Reset event counters.
        const EVENT_RESET = 1 << 1;
        /// Reset the cycle counter.
        const CYCLE_RESET = 1 << 2;
        /// Cycle counter ticks once every 64 cycles.
        const CYCLE_DIV64 = 1 << 3;
    }
}

/// PMCNTENSET bit that enables `PMCCNTR`.
pub const PMCNTENSET_CYCLE: u32 = 1 << 31;

// ----------------------------------------------------------------------------
// Hardware
// ----------------------------------------------------------------------------

#[cfg(all(not(los_host), los_irq = "cps"))]
#[inline(always)]
pub fn read_cpsr() -> PsrFlags {
    let cpsr: u32;
    // SAFETY: reading CPSR has no side effects
    unsafe { core::arch::asm!("mrs {}, cpsr", out(reg) cpsr, options(nomem, nostack, preserves_flags)) };
    PsrFlags::from_bits_retain(cpsr)
}

#[cfg(all(not(los_host), los_context = "register"))]
#[inline(always)]
pub fn read_tpidrprw() -> usize {
    let value: usize;
    // SAFETY: TPIDRPRW is a plain software-owned register
    unsafe {
        core::arch::asm!("mrc p15, 0, {}, c13, c0, 4", out(reg) value, options(nomem, nostack, preserves_flags))
    };
    value
}

/// # Safety
/// Overwrites the current-thread register of this core.
#[cfg(all(not(los_host), los_context = "register"))]
#[inline(always)]
pub unsafe fn write_tpidrprw(value: usize) {
    unsafe {
        core::arch::asm!("mcr p15, 0, {}, c13, c0, 4", in(reg) value, options(nomem, nostack, preserves_flags))
    };
}

#[cfg(all(not(los_host), los_cycle = "pmu"))]
#[inline(always)]
pub fn read_pmccntr() -> u32 {
    let count: u32;
    // SAFETY: reading the cycle counter has no side effects
    unsafe {
        core::arch::asm!("mrc p15, 0, {}, c9, c13, 0", out(reg) count, options(nomem, nostack, preserves_flags))
    };
    count
}

#[cfg(all(not(los_host), los_cycle = "pmu"))]
#[inline(always)]
pub fn read_pmcr() -> PmcrFlags {
    let pmcr: u32;
    // SAFETY: reading PMCR has no side effects
    unsafe {
        core::arch::asm!("mrc p15, 0, {}, c9, c12, 0", out(reg) pmcr, options(nomem, nostack, preserves_flags))
    };
    PmcrFlags::from_bits_retain(pmcr)
}

/// # Safety
/// Reconfigures the performance monitor for the whole core.
#[cfg(all(not(los_host), los_cycle = "pmu"))]
#[inline(always)]
pub unsafe fn write_pmcr(flags: PmcrFlags) {
    unsafe {
        core::arch::asm!("mcr p15, 0, {}, c9, c12, 0", in(reg) flags.bits(), options(nomem, nostack, preserves_flags))
    };
}

/// # Safety
/// Enables the counters named by `mask` for the whole core.
#[cfg(all(not(los_host), los_cycle = "pmu"))]
#[inline(always)]
pub unsafe fn write_pmcntenset(mask: u32) {
    unsafe {
        core::arch::asm!("mcr p15, 0, {}, c9, c12, 1", in(reg) mask, options(nomem, nostack, preserves_flags))
    };
}

#[cfg(all(not(los_host), los_cycle = "dwt"))]
#[inline(always)]
pub fn read_dwt_cyccnt() -> u32 {
    cortex_m::peripheral::DWT::cycle_count()
}

#[cfg(all(not(los_host), los_cycle = "dwt"))]
pub fn dwt_has_cyccnt() -> bool {
    // SAFETY: only the read-only DWT_CTRL.NOCYCCNT bit is inspected
    let peripherals = unsafe { cortex_m::Peripherals::steal() };
    peripherals.DWT.has_cycle_counter()
}

/// # Safety
/// Turns on trace in DEMCR and `CYCCNTENA` in DWT_CTRL without resetting the count.
#[cfg(all(not(los_host), los_cycle = "dwt"))]
pub unsafe fn enable_dwt_cyccnt() {
    let mut peripherals = unsafe { cortex_m::Peripherals::steal() };
    peripherals.DCB.enable_trace();
    peripherals.DWT.enable_cycle_counter();
}

// ----------------------------------------------------------------------------
// Host simulation
// ----------------------------------------------------------------------------

#[cfg(all(los_host, feature = "std"))]
pub mod mock {
    use std::cell::Cell;

    /// Ticks the simulated cycle counter advances on every read while enabled.
    pub const TICKS_PER_READ: u32 = 7;

    std::thread_local! {
        pub static CPSR: Cell<u32> = const { Cell::new(0) };
        pub static TPIDRPRW: Cell<usize> = const { Cell::new(0) };
        pub static PMCR: Cell<u32> = const { Cell::new(0) };
        pub static PMCNTENSET: Cell<u32> = const { Cell::new(0) };
        pub static DWT_CYCCNTENA: Cell<bool> = const { Cell::new(false) };
        pub static CYCLES: Cell<u32> = const { Cell::new(0) };
    }

    /// Preload the simulated counter, e.g. just below a wraparound.
    pub fn set_cycles(value: u32) {
        CYCLES.with(|c| c.set(value));
    }

    /// Advance the simulated counter and return the value before the tick.
    pub(crate) fn tick() -> u32 {
        CYCLES.with(|c| {
            let now = c.get();
            c.set(now.wrapping_add(TICKS_PER_READ));
            now
        })
    }
}

#[cfg(los_host)]
#[inline(always)]
pub fn read_cpsr() -> PsrFlags {
    #[cfg(feature = "std")]
    return PsrFlags::from_bits_retain(mock::CPSR.with(core::cell::Cell::get));
    #[cfg(not(feature = "std"))]
    PsrFlags::empty() // Stub for no-std host builds
}

/// Apply `f` to the simulated CPSR.
#[cfg(los_host)]
#[inline(always)]
pub fn modify_cpsr(f: impl FnOnce(PsrFlags) -> PsrFlags) {
    #[cfg(feature = "std")]
    mock::CPSR.with(|cpsr| cpsr.set(f(PsrFlags::from_bits_retain(cpsr.get())).bits()));
    #[cfg(not(feature = "std"))]
    let _ = f;
}

#[cfg(los_host)]
#[inline(always)]
pub fn read_tpidrprw() -> usize {
    #[cfg(feature = "std")]
    return mock::TPIDRPRW.with(core::cell::Cell::get);
    #[cfg(not(feature = "std"))]
    0
}

/// # Safety
/// Overwrites the simulated current-thread register of this host thread.
#[cfg(los_host)]
#[inline(always)]
pub unsafe fn write_tpidrprw(value: usize) {
    #[cfg(feature = "std")]
    mock::TPIDRPRW.with(|r| r.set(value));
    #[cfg(not(feature = "std"))]
    let _ = value;
}

#[cfg(los_host)]
pub fn read_pmccntr() -> u32 {
    #[cfg(feature = "std")]
    {
        let enabled = read_pmcr().contains(PmcrFlags::ENABLE)
            && mock::PMCNTENSET.with(core::cell::Cell::get) & PMCNTENSET_CYCLE != 0;
        if enabled { mock::tick() } else { mock::CYCLES.with(core::cell::Cell::get) }
    }
    #[cfg(not(feature = "std"))]
    0
}

#[cfg(los_host)]
pub fn read_pmcr() -> PmcrFlags {
    #[cfg(feature = "std")]
    return PmcrFlags::from_bits_retain(mock::PMCR.with(core::cell::Cell::get));
    #[cfg(not(feature = "std"))]
    PmcrFlags::empty()
}

/// # Safety
/// Reconfigures the simulated performance monitor.
#[cfg(los_host)]
pub unsafe fn write_pmcr(flags: PmcrFlags) {
    #[cfg(feature = "std")]
    {
        if flags.contains(PmcrFlags::CYCLE_RESET) {
            mock::set_cycles(0);
        }
        // Reset bits are write-only
        let stored = flags - PmcrFlags::CYCLE_RESET - PmcrFlags::EVENT_RESET;
        mock::PMCR.with(|r| r.set(stored.bits()));
    }
    #[cfg(not(feature = "std"))]
    let _ = flags;
}

/// # Safety
/// Enables simulated counters named by `mask`.
#[cfg(los_host)]
pub unsafe fn write_pmcntenset(mask: u32) {
    #[cfg(feature = "std")]
    mock::PMCNTENSET.with(|r| r.set(r.get() | mask));
    #[cfg(not(feature = "std"))]
    let _ = mask;
}

#[cfg(los_host)]
pub fn read_dwt_cyccnt() -> u32 {
    #[cfg(feature = "std")]
    {
        if mock::DWT_CYCCNTENA.with(core::cell::Cell::get) {
            mock::tick()
        } else {
            mock::CYCLES.with(core::cell::Cell::get)
        }
    }
    #[cfg(not(feature = "std"))]
    0
}

#[cfg(los_host)]
pub fn dwt_has_cyccnt() -> bool {
    cfg!(feature = "std")
}

/// # Safety
/// Enables the simulated DWT cycle counter.
#[cfg(los_host)]
pub unsafe fn enable_dwt_cyccnt() {
    #[cfg(feature = "std")]
    mock::DWT_CYCCNTENA.with(|r| r.set(true));
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_cpsr_mask_bits_match_architecture() {
        assert_eq!(PsrFlags::IRQ_MASK.bits(), 0x80);
        assert_eq!(PsrFlags::FIQ_MASK.bits(), 0x40);
        assert_eq!((PsrFlags::IRQ_MASK | PsrFlags::FIQ_MASK).bits(), 0xC0);
    }

    #[test]
    fn test_simulated_registers_are_per_thread() {
        unsafe { write_tpidrprw(0x1000) };
        modify_cpsr(|f| f | PsrFlags::IRQ_MASK);

        let other = std::thread::spawn(|| (read_tpidrprw(), read_cpsr())).join().unwrap();
        assert_eq!(other, (0, PsrFlags::empty()));

        assert_eq!(read_tpidrprw(), 0x1000);
        assert!(read_cpsr().contains(PsrFlags::IRQ_MASK));
    }

    #[test]
    fn test_pmu_counts_only_when_enabled() {
        mock::set_cycles(100);
        assert_eq!(read_pmccntr(), 100);
        assert_eq!(read_pmccntr(), 100);

        unsafe {
            write_pmcr(read_pmcr() | PmcrFlags::ENABLE);
            write_pmcntenset(PMCNTENSET_CYCLE);
        }
        assert_eq!(read_pmccntr(), 100);
        assert_eq!(read_pmccntr(), 100 + mock::TICKS_PER_READ);
    }

    #[test]
    fn test_pmcr_cycle_reset_is_write_only() {
        mock::set_cycles(5000);
        unsafe { write_pmcr(PmcrFlags::ENABLE | PmcrFlags::CYCLE_RESET) };
        assert_eq!(read_pmcr(), PmcrFlags::ENABLE);
        assert_eq!(mock::CYCLES.with(core::cell::Cell::get), 0);
    }
}
