//! TEAM_500: Interrupt masking.
//!
//! Two classes: normal (IRQ) and fast (FIQ; FAULTMASK on M-profile). Every
//! transition is bracketed by a compiler fence so ordinary loads and stores
//! are not moved across it. Queries read the live mask bit each time.
//!
//! There is no nesting counter. Callers that may already run masked use
//! [`save_and_disable`] and [`restore`], which put back whatever state was
//! observed.

use core::sync::atomic::{AtomicBool, Ordering, compiler_fence};

/// Saved normal-class mask state.
#[must_use = "restore the saved state when leaving the critical section"]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterruptState {
    disabled: bool,
}

impl InterruptState {
    /// Whether normal interrupts were masked when the state was saved.
    pub const fn was_disabled(self) -> bool {
        self.disabled
    }
}

/// Set by the interrupt entry/exit glue. Single-core configurations only.
static IN_HANDLER: AtomicBool = AtomicBool::new(false);

/// [I1] Unmask normal interrupts.
#[inline(always)]
pub fn enable_normal() {
    compiler_fence(Ordering::SeqCst);
    imp::enable_normal();
}

/// [I2] Mask normal interrupts. Repeating it is harmless.
#[inline(always)]
pub fn disable_normal() {
    imp::disable_normal();
    compiler_fence(Ordering::SeqCst);
}

/// [I3] `true` while normal interrupts are masked, read live.
#[inline(always)]
pub fn normal_is_disabled() -> bool {
    imp::normal_is_disabled()
}

/// Unmask fast interrupts.
#[inline(always)]
pub fn enable_fast() {
    compiler_fence(Ordering::SeqCst);
    imp::enable_fast();
}

/// Mask fast interrupts.
#[inline(always)]
pub fn disable_fast() {
    imp::disable_fast();
    compiler_fence(Ordering::SeqCst);
}

/// `true` while fast interrupts are masked.
#[inline(always)]
pub fn fast_is_disabled() -> bool {
    imp::fast_is_disabled()
}

/// [I4] Mask normal interrupts and return the state they had before.
#[inline(always)]
pub fn save_and_disable() -> InterruptState {
    let state = InterruptState {
        disabled: normal_is_disabled(),
    };
    disable_normal();
    state
}

/// [I5] Put back a state from [`save_and_disable`].
///
/// Only unmasks when the saved state was unmasked.
#[inline(always)]
pub fn restore(state: InterruptState) {
    if !state.disabled {
        enable_normal();
    }
}

/// `true` while the interrupt glue reports a handler is running.
#[inline]
pub fn in_handler() -> bool {
    IN_HANDLER.load(Ordering::Relaxed)
}

/// Called by the interrupt entry/exit glue.
#[inline]
pub fn set_in_handler(active: bool) {
    IN_HANDLER.store(active, Ordering::Relaxed);
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

#[cfg(los_host)]
mod imp {
    use crate::cpu::{self, PsrFlags};

    #[inline(always)]
    pub fn enable_normal() {
        cpu::modify_cpsr(|psr| psr - PsrFlags::IRQ_MASK);
    }

    #[inline(always)]
    pub fn disable_normal() {
        cpu::modify_cpsr(|psr| psr | PsrFlags::IRQ_MASK);
    }

    #[inline(always)]
    pub fn normal_is_disabled() -> bool {
        cpu::read_cpsr().contains(PsrFlags::IRQ_MASK)
    }

    #[inline(always)]
    pub fn enable_fast() {
        cpu::modify_cpsr(|psr| psr - PsrFlags::FIQ_MASK);
    }

    #[inline(always)]
    pub fn disable_fast() {
        cpu::modify_cpsr(|psr| psr | PsrFlags::FIQ_MASK);
    }

    #[inline(always)]
    pub fn fast_is_disabled() -> bool {
        cpu::read_cpsr().contains(PsrFlags::FIQ_MASK)
    }
}

#[cfg(all(not(los_host), los_irq = "cps"))]
mod imp {
    use core::arch::asm;

    use crate::cpu::{self, PsrFlags};

    // SAFETY (all blocks): privileged code may change its own mask bits.
    // No `nomem`, so each block is also a compiler barrier.

    #[inline(always)]
    pub fn enable_normal() {
        unsafe { asm!("cpsie i", options(nostack, preserves_flags)) };
    }

    #[inline(always)]
    pub fn disable_normal() {
        unsafe { asm!("cpsid i", options(nostack, preserves_flags)) };
    }

    #[inline(always)]
    pub fn normal_is_disabled() -> bool {
        cpu::read_cpsr().contains(PsrFlags::IRQ_MASK)
    }

    #[inline(always)]
    pub fn enable_fast() {
        unsafe { asm!("cpsie f", options(nostack, preserves_flags)) };
    }

    #[inline(always)]
    pub fn disable_fast() {
        unsafe { asm!("cpsid f", options(nostack, preserves_flags)) };
    }

    #[inline(always)]
    pub fn fast_is_disabled() -> bool {
        cpu::read_cpsr().contains(PsrFlags::FIQ_MASK)
    }
}

#[cfg(all(not(los_host), los_irq = "cortex_m"))]
mod imp {
    use cortex_m::register::{faultmask, primask};

    #[inline(always)]
    pub fn enable_normal() {
        // SAFETY: callers own the critical-section discipline
        unsafe { cortex_m::interrupt::enable() };
    }

    #[inline(always)]
    pub fn disable_normal() {
        cortex_m::interrupt::disable();
    }

    #[inline(always)]
    pub fn normal_is_disabled() -> bool {
        primask::read().is_inactive()
    }

    #[inline(always)]
    pub fn enable_fast() {
        // SAFETY: as above
        unsafe { core::arch::asm!("cpsie f", options(nostack, preserves_flags)) };
    }

    #[inline(always)]
    pub fn disable_fast() {
        // SAFETY: as above
        unsafe { core::arch::asm!("cpsid f", options(nostack, preserves_flags)) };
    }

    #[inline(always)]
    pub fn fast_is_disabled() -> bool {
        faultmask::read().is_inactive()
    }
}

#[cfg(all(not(los_host), los_irq = "outline"))]
mod imp {
    use crate::outline;

    // SAFETY (all calls): the routines only touch CPSR mask bits.

    #[inline(always)]
    pub fn enable_normal() {
        unsafe { outline::los_arch_enable_ints() };
    }

    #[inline(always)]
    pub fn disable_normal() {
        unsafe { outline::los_arch_disable_ints() };
    }

    #[inline(always)]
    pub fn normal_is_disabled() -> bool {
        outline::los_arch_ints_disabled()
    }

    #[inline(always)]
    pub fn enable_fast() {
        unsafe { outline::los_arch_enable_fiqs() };
    }

    #[inline(always)]
    pub fn disable_fast() {
        unsafe { outline::los_arch_disable_fiqs() };
    }

    #[inline(always)]
    pub fn fast_is_disabled() -> bool {
        outline::los_arch_fiqs_disabled()
    }
}
