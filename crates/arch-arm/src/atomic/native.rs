//! TEAM_500: Compiler atomics.
//!
//! Where the core has native atomic support the engine simply forwards to
//! `core::sync::atomic` with relaxed ordering.

use core::sync::atomic::Ordering::Relaxed;

use super::{AtomicEngine, MachineWord};

/// Native atomic-intrinsic strategy.
pub struct Native;

impl AtomicEngine for Native {
    #[inline(always)]
    fn add(word: &MachineWord, val: i32) -> i32 {
        word.fetch_add(val, Relaxed)
    }

    #[inline(always)]
    fn or(word: &MachineWord, val: i32) -> i32 {
        word.fetch_or(val, Relaxed)
    }

    #[inline(always)]
    fn and(word: &MachineWord, val: i32) -> i32 {
        word.fetch_and(val, Relaxed)
    }

    #[inline(always)]
    fn swap(word: &MachineWord, val: i32) -> i32 {
        word.swap(val, Relaxed)
    }

    #[inline(always)]
    fn compare_exchange(word: &MachineWord, expected: i32, new: i32) -> i32 {
        match word.compare_exchange(expected, new, Relaxed, Relaxed) {
            Ok(old) | Err(old) => old,
        }
    }
}
