//! TEAM_500: Atomic read-modify-write on one machine word.
//!
//! Every operation returns the value the word held immediately before it was
//! modified. `compare_exchange` stores only when the word equals `expected`
//! and reports the observed value either way, so success is
//! `compare_exchange(w, e, n) == e`.
//!
//! # Ordering
//!
//! Relaxed. The engine adds no acquire/release fences beyond what the
//! exclusive-access instructions imply; lock implementations built on top
//! must add their own barriers.
//!
//! # Fairness
//!
//! The exclusive strategies retry until their conditional store commits.
//! There is no retry bound and no backoff, so a word hammered hard enough
//! by other writers can starve one caller indefinitely.
//!
//! # Strategies
//!
//! | Strategy    | Used on                     | Mechanism                          |
//! |-------------|-----------------------------|------------------------------------|
//! | `Native`    | ARMv8-A AArch32             | `core::sync::atomic` intrinsics    |
//! | `Exclusive` | ARMv6 (A32), ARMv7-A/R/M    | inline `ldrex`/`strex` retry loop  |
//! | `OutOfLine` | ARMv5, ARMv6 Thumb-1 builds | exported A32 routines              |
//!
//! The build script picks one; the free functions in this module route to it
//! through [`Selected`]. Host builds compile all three so they can be run
//! against the same conformance suite.

use core::sync::atomic::AtomicI32;

use static_assertions::const_assert_eq;

use crate::isa::AtomicStrategy;

#[cfg(any(los_host, los_atomics = "exclusive"))]
pub(crate) mod exclusive;
#[cfg(any(los_host, los_atomics = "native"))]
mod native;

#[cfg(any(los_host, los_atomics = "exclusive"))]
pub use exclusive::Exclusive;
#[cfg(any(los_host, los_atomics = "native"))]
pub use native::Native;
#[cfg(any(los_host, los_atomics = "outline"))]
pub use crate::outline::OutOfLine;

/// The unit every atomic operation works on.
pub type MachineWord = AtomicI32;

const_assert_eq!(core::mem::size_of::<MachineWord>(), 4);
const_assert_eq!(core::mem::align_of::<MachineWord>(), 4);

/// One implementation of the atomic engine.
///
/// Implementations must be externally indistinguishable: same return values,
/// same final memory contents, same (relaxed) ordering.
pub trait AtomicEngine {
    /// Wrapping add; returns the previous value.
    fn add(word: &MachineWord, val: i32) -> i32;
    /// Bitwise or; returns the previous value.
    fn or(word: &MachineWord, val: i32) -> i32;
    /// Bitwise and; returns the previous value.
    fn and(word: &MachineWord, val: i32) -> i32;
    /// Store `val`; returns the previous value.
    fn swap(word: &MachineWord, val: i32) -> i32;
    /// Store `new` if the word equals `expected`; returns the observed value.
    fn compare_exchange(word: &MachineWord, expected: i32, new: i32) -> i32;
}

/// Modification applied by one read-modify-write.
#[cfg(any(los_host, los_atomics = "exclusive"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RmwOp {
    Add,
    Or,
    And,
    Swap,
}

#[cfg(any(los_host, los_atomics = "exclusive"))]
impl RmwOp {
    #[inline(always)]
    pub(crate) const fn apply(self, old: i32, val: i32) -> i32 {
        match self {
            Self::Add => old.wrapping_add(val),
            Self::Or => old | val,
            Self::And => old & val,
            Self::Swap => val,
        }
    }
}

/// Engine chosen for this build.
#[cfg(los_atomics = "native")]
pub type Selected = Native;
#[cfg(los_atomics = "exclusive")]
pub type Selected = Exclusive;
#[cfg(los_atomics = "outline")]
pub type Selected = OutOfLine;

/// Strategy behind [`Selected`].
#[cfg(los_atomics = "native")]
pub const STRATEGY: AtomicStrategy = AtomicStrategy::Native;
#[cfg(los_atomics = "exclusive")]
pub const STRATEGY: AtomicStrategy = AtomicStrategy::Exclusive;
#[cfg(los_atomics = "outline")]
pub const STRATEGY: AtomicStrategy = AtomicStrategy::OutOfLine;

#[inline(always)]
pub fn add(word: &MachineWord, val: i32) -> i32 {
    Selected::add(word, val)
}

#[inline(always)]
pub fn or(word: &MachineWord, val: i32) -> i32 {
    Selected::or(word, val)
}

#[inline(always)]
pub fn and(word: &MachineWord, val: i32) -> i32 {
    Selected::and(word, val)
}

#[inline(always)]
pub fn swap(word: &MachineWord, val: i32) -> i32 {
    Selected::swap(word, val)
}

#[inline(always)]
pub fn compare_exchange(word: &MachineWord, expected: i32, new: i32) -> i32 {
    Selected::compare_exchange(word, expected, new)
}
