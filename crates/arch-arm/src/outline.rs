//! TEAM_500: Out-of-line primitives.
//!
//! Builds whose instruction encoding cannot carry the inline sequences
//! (ARMv5 has no `ldrex`/`strex`, Thumb-1 has no encoding for them, nor for
//! `mrs`/`msr`) call these routines instead. Every routine is compiled in A32
//! state and exported unmangled so assembly glue can reach it too.
//!
//! The instruction block is written out in each routine rather than shared
//! through an inlined helper: a Thumb-state helper cannot be inlined into an
//! A32 function.
//!
//! On ARMv5 there is no exclusive monitor. The atomic routines mask IRQ and
//! FIQ around a plain load/store instead, which is atomic only on a single
//! core running privileged code.

#[cfg(any(los_host, los_atomics = "outline"))]
use crate::atomic::{AtomicEngine, MachineWord};

/// Out-of-line call-through strategy.
#[cfg(any(los_host, los_atomics = "outline"))]
pub struct OutOfLine;

#[cfg(any(los_host, los_atomics = "outline"))]
impl AtomicEngine for OutOfLine {
    #[inline(always)]
    fn add(word: &MachineWord, val: i32) -> i32 {
        // SAFETY: the pointer comes from a live, aligned word
        unsafe { los_atomic_add(word.as_ptr(), val) }
    }

    #[inline(always)]
    fn or(word: &MachineWord, val: i32) -> i32 {
        // SAFETY: as above
        unsafe { los_atomic_or(word.as_ptr(), val) }
    }

    #[inline(always)]
    fn and(word: &MachineWord, val: i32) -> i32 {
        // SAFETY: as above
        unsafe { los_atomic_and(word.as_ptr(), val) }
    }

    #[inline(always)]
    fn swap(word: &MachineWord, val: i32) -> i32 {
        // SAFETY: as above
        unsafe { los_atomic_swap(word.as_ptr(), val) }
    }

    #[inline(always)]
    fn compare_exchange(word: &MachineWord, expected: i32, new: i32) -> i32 {
        // SAFETY: as above
        unsafe { los_atomic_cmpxchg(word.as_ptr(), expected, new) }
    }
}

// ----------------------------------------------------------------------------
// Atomic routines, cores with an exclusive monitor
// ----------------------------------------------------------------------------

#[cfg(all(not(los_host), los_atomics = "outline", los_exclusive_monitor))]
macro_rules! rmw_routine {
    ($(#[$meta:meta])* $name:ident, $op:literal) => {
        $(#[$meta])*
        ///
        /// # Safety
        /// `ptr` must be non-null, 4-byte aligned and valid for reads and writes.
        #[unsafe(no_mangle)]
        #[inline(never)]
        #[instruction_set(arm::a32)]
        pub unsafe extern "C" fn $name(ptr: *mut i32, val: i32) -> i32 {
            let old: i32;
            core::arch::asm!(
                "2:",
                "ldrex {old}, [{ptr}]",
                $op,
                "strex {status}, {new}, [{ptr}]",
                "cmp {status}, #0",
                "bne 2b",
                ptr = in(reg) ptr,
                val = in(reg) val,
                old = out(reg) old,
                new = out(reg) _,
                status = out(reg) _,
                options(nostack),
            );
            old
        }
    };
}

#[cfg(all(not(los_host), los_atomics = "outline", los_exclusive_monitor))]
rmw_routine!(
    /// Atomic wrapping add; returns the previous value.
    los_atomic_add, "add {new}, {old}, {val}"
);
#[cfg(all(not(los_host), los_atomics = "outline", los_exclusive_monitor))]
rmw_routine!(
    /// Atomic bitwise or; returns the previous value.
    los_atomic_or, "orr {new}, {old}, {val}"
);
#[cfg(all(not(los_host), los_atomics = "outline", los_exclusive_monitor))]
rmw_routine!(
    /// Atomic bitwise and; returns the previous value.
    los_atomic_and, "and {new}, {old}, {val}"
);
#[cfg(all(not(los_host), los_atomics = "outline", los_exclusive_monitor))]
rmw_routine!(
    /// Atomic store; returns the previous value.
    los_atomic_swap, "mov {new}, {val}"
);

/// Store `new` if `*ptr == expected`; returns the observed value.
///
/// # Safety
/// `ptr` must be non-null, 4-byte aligned and valid for reads and writes.
#[cfg(all(not(los_host), los_atomics = "outline", los_exclusive_monitor))]
#[unsafe(no_mangle)]
#[inline(never)]
#[instruction_set(arm::a32)]
pub unsafe extern "C" fn los_atomic_cmpxchg(ptr: *mut i32, expected: i32, new: i32) -> i32 {
    let old: i32;
    core::arch::asm!(
        "2:",
        "ldrex {old}, [{ptr}]",
        "cmp {old}, {expected}",
        "bne 3f",
        "strex {status}, {new}, [{ptr}]",
        "cmp {status}, #0",
        "bne 2b",
        "3:",
        ptr = in(reg) ptr,
        expected = in(reg) expected,
        new = in(reg) new,
        old = out(reg) old,
        status = out(reg) _,
        options(nostack),
    );
    old
}

// ----------------------------------------------------------------------------
// Atomic routines, ARMv5 (no exclusive monitor)
// ----------------------------------------------------------------------------

#[cfg(all(not(los_host), los_atomics = "outline", not(los_exclusive_monitor)))]
macro_rules! masked_routine {
    ($(#[$meta:meta])* $name:ident, $op:literal) => {
        $(#[$meta])*
        ///
        /// # Safety
        /// `ptr` must be non-null, 4-byte aligned and valid for reads and
        /// writes. Single-core, privileged mode only.
        #[unsafe(no_mangle)]
        #[inline(never)]
        #[instruction_set(arm::a32)]
        pub unsafe extern "C" fn $name(ptr: *mut i32, val: i32) -> i32 {
            let old: i32;
            core::arch::asm!(
                "mrs {saved}, cpsr",
                "orr {tmp}, {saved}, #0xc0",
                "msr cpsr_c, {tmp}",
                "ldr {old}, [{ptr}]",
                $op,
                "str {tmp}, [{ptr}]",
                "msr cpsr_c, {saved}",
                ptr = in(reg) ptr,
                val = in(reg) val,
                old = out(reg) old,
                saved = out(reg) _,
                tmp = out(reg) _,
                options(nostack),
            );
            old
        }
    };
}

#[cfg(all(not(los_host), los_atomics = "outline", not(los_exclusive_monitor)))]
masked_routine!(
    /// Atomic wrapping add; returns the previous value.
    los_atomic_add, "add {tmp}, {old}, {val}"
);
#[cfg(all(not(los_host), los_atomics = "outline", not(los_exclusive_monitor)))]
masked_routine!(
    /// Atomic bitwise or; returns the previous value.
    los_atomic_or, "orr {tmp}, {old}, {val}"
);
#[cfg(all(not(los_host), los_atomics = "outline", not(los_exclusive_monitor)))]
masked_routine!(
    /// Atomic bitwise and; returns the previous value.
    los_atomic_and, "and {tmp}, {old}, {val}"
);
#[cfg(all(not(los_host), los_atomics = "outline", not(los_exclusive_monitor)))]
masked_routine!(
    /// Atomic store; returns the previous value.
    los_atomic_swap, "mov {tmp}, {val}"
);

/// Store `new` if `*ptr == expected`; returns the observed value.
///
/// # Safety
/// `ptr` must be non-null, 4-byte aligned and valid for reads and writes.
/// Single-core, privileged mode only.
#[cfg(all(not(los_host), los_atomics = "outline", not(los_exclusive_monitor)))]
#[unsafe(no_mangle)]
#[inline(never)]
#[instruction_set(arm::a32)]
pub unsafe extern "C" fn los_atomic_cmpxchg(ptr: *mut i32, expected: i32, new: i32) -> i32 {
    let old: i32;
    core::arch::asm!(
        "mrs {saved}, cpsr",
        "orr {tmp}, {saved}, #0xc0",
        "msr cpsr_c, {tmp}",
        "ldr {old}, [{ptr}]",
        "cmp {old}, {expected}",
        "streq {new}, [{ptr}]",
        "msr cpsr_c, {saved}",
        ptr = in(reg) ptr,
        expected = in(reg) expected,
        new = in(reg) new,
        old = out(reg) old,
        saved = out(reg) _,
        tmp = out(reg) _,
        options(nostack),
    );
    old
}

// ----------------------------------------------------------------------------
// Atomic routines, host simulation
// ----------------------------------------------------------------------------

#[cfg(los_host)]
mod host {
    use core::sync::atomic::AtomicI32;

    use crate::atomic::RmwOp;
    use crate::atomic::exclusive;

    /// # Safety
    /// `ptr` must be non-null, aligned and valid for the duration of the call.
    #[inline(always)]
    unsafe fn rmw(ptr: *mut i32, op: RmwOp, val: i32) -> i32 {
        exclusive::rmw(AtomicI32::from_ptr(ptr), op, val)
    }

    /// # Safety
    /// See [`los_atomic_add`].
    #[unsafe(no_mangle)]
    #[inline(never)]
    pub unsafe extern "C" fn los_atomic_add(ptr: *mut i32, val: i32) -> i32 {
        rmw(ptr, RmwOp::Add, val)
    }

    /// # Safety
    /// See [`los_atomic_add`].
    #[unsafe(no_mangle)]
    #[inline(never)]
    pub unsafe extern "C" fn los_atomic_or(ptr: *mut i32, val: i32) -> i32 {
        rmw(ptr, RmwOp::Or, val)
    }

    /// # Safety
    /// See [`los_atomic_add`].
    #[unsafe(no_mangle)]
    #[inline(never)]
    pub unsafe extern "C" fn los_atomic_and(ptr: *mut i32, val: i32) -> i32 {
        rmw(ptr, RmwOp::And, val)
    }

    /// # Safety
    /// See [`los_atomic_add`].
    #[unsafe(no_mangle)]
    #[inline(never)]
    pub unsafe extern "C" fn los_atomic_swap(ptr: *mut i32, val: i32) -> i32 {
        rmw(ptr, RmwOp::Swap, val)
    }

    /// # Safety
    /// See [`los_atomic_add`].
    #[unsafe(no_mangle)]
    #[inline(never)]
    pub unsafe extern "C" fn los_atomic_cmpxchg(ptr: *mut i32, expected: i32, new: i32) -> i32 {
        exclusive::compare_exchange(AtomicI32::from_ptr(ptr), expected, new)
    }
}

#[cfg(los_host)]
pub use host::{los_atomic_add, los_atomic_and, los_atomic_cmpxchg, los_atomic_or, los_atomic_swap};

// ----------------------------------------------------------------------------
// Interrupt mask routines
// ----------------------------------------------------------------------------

#[cfg(all(not(los_host), los_irq = "outline"))]
macro_rules! mask_routine {
    ($(#[$meta:meta])* $name:ident, $op:literal) => {
        $(#[$meta])*
        ///
        /// # Safety
        /// Privileged mode only.
        #[unsafe(no_mangle)]
        #[inline(never)]
        #[instruction_set(arm::a32)]
        pub unsafe extern "C" fn $name() {
            core::arch::asm!(
                "mrs {psr}, cpsr",
                $op,
                "msr cpsr_c, {psr}",
                psr = out(reg) _,
                options(nostack),
            );
        }
    };
}

#[cfg(all(not(los_host), los_irq = "outline"))]
macro_rules! query_routine {
    ($(#[$meta:meta])* $name:ident, $mask:literal) => {
        $(#[$meta])*
        #[unsafe(no_mangle)]
        #[inline(never)]
        #[instruction_set(arm::a32)]
        pub extern "C" fn $name() -> bool {
            let psr: u32;
            // SAFETY: reading CPSR has no side effects
            unsafe {
                core::arch::asm!(
                    "mrs {psr}, cpsr",
                    psr = out(reg) psr,
                    options(nomem, nostack, preserves_flags),
                );
            }
            psr & $mask != 0
        }
    };
}

#[cfg(all(not(los_host), los_irq = "outline"))]
mask_routine!(
    /// Clear CPSR.I.
    los_arch_enable_ints, "bic {psr}, {psr}, #0x80"
);
#[cfg(all(not(los_host), los_irq = "outline"))]
mask_routine!(
    /// Set CPSR.I.
    los_arch_disable_ints, "orr {psr}, {psr}, #0x80"
);
#[cfg(all(not(los_host), los_irq = "outline"))]
mask_routine!(
    /// Clear CPSR.F.
    los_arch_enable_fiqs, "bic {psr}, {psr}, #0x40"
);
#[cfg(all(not(los_host), los_irq = "outline"))]
mask_routine!(
    /// Set CPSR.F.
    los_arch_disable_fiqs, "orr {psr}, {psr}, #0x40"
);
#[cfg(all(not(los_host), los_irq = "outline"))]
query_routine!(
    /// `true` while CPSR.I is set.
    los_arch_ints_disabled, 0x80
);
#[cfg(all(not(los_host), los_irq = "outline"))]
query_routine!(
    /// `true` while CPSR.F is set.
    los_arch_fiqs_disabled, 0x40
);

#[cfg(all(test, feature = "std", los_host))]
mod tests {
    use super::*;
    use core::sync::atomic::Ordering;

    #[test]
    fn test_exported_routines_act_on_raw_pointers() {
        let mut raw = 10i32;
        let ptr = &raw mut raw;
        unsafe {
            assert_eq!(los_atomic_add(ptr, 5), 10);
            assert_eq!(los_atomic_or(ptr, 0x100), 15);
            assert_eq!(los_atomic_and(ptr, 0xff), 0x10f);
            assert_eq!(los_atomic_swap(ptr, -1), 0x0f);
            assert_eq!(los_atomic_cmpxchg(ptr, 0, 3), -1);
            assert_eq!(los_atomic_cmpxchg(ptr, -1, 3), -1);
        }
        assert_eq!(raw, 3);
    }

    #[test]
    fn test_engine_matches_contract() {
        let word = MachineWord::new(5);
        assert_eq!(OutOfLine::compare_exchange(&word, 5, 9), 5);
        assert_eq!(OutOfLine::compare_exchange(&word, 5, 1), 9);
        assert_eq!(OutOfLine::add(&word, 1), 9);
        assert_eq!(word.load(Ordering::Relaxed), 10);
    }
}
