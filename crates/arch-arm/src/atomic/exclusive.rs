//! TEAM_500: `ldrex`/`strex` retry loop.
//!
//! One attempt loads the word exclusively, computes the new value and tries
//! a conditional store. If another agent touched the word in between (or an
//! exception cleared the monitor) the store fails and the whole attempt is
//! repeated from the load. Compare-exchange only repeats on a failed store;
//! a value mismatch finishes immediately with the observed value.
//!
//! On hosts the monitor is modelled with a weak compare-exchange, which fails
//! exactly when the word changed since the paired load (or spuriously, like a
//! real monitor may).

use super::{AtomicEngine, MachineWord, RmwOp};

/// Inline exclusive-monitor strategy.
pub struct Exclusive;

/// Outcome of one load-exclusive / store-exclusive pass.
enum Attempt {
    /// The operation took effect (or needed no store); carries the observed value.
    Done(i32),
    /// The conditional store lost its reservation.
    Interrupted,
}

#[inline(always)]
pub(crate) fn rmw(word: &MachineWord, op: RmwOp, val: i32) -> i32 {
    loop {
        if let Attempt::Done(old) = attempt(word, op, val) {
            return old;
        }
    }
}

#[inline(always)]
pub(crate) fn compare_exchange(word: &MachineWord, expected: i32, new: i32) -> i32 {
    loop {
        if let Attempt::Done(old) = attempt_compare(word, expected, new) {
            return old;
        }
    }
}

impl AtomicEngine for Exclusive {
    #[inline(always)]
    fn add(word: &MachineWord, val: i32) -> i32 {
        rmw(word, RmwOp::Add, val)
    }

    #[inline(always)]
    fn or(word: &MachineWord, val: i32) -> i32 {
        rmw(word, RmwOp::Or, val)
    }

    #[inline(always)]
    fn and(word: &MachineWord, val: i32) -> i32 {
        rmw(word, RmwOp::And, val)
    }

    #[inline(always)]
    fn swap(word: &MachineWord, val: i32) -> i32 {
        rmw(word, RmwOp::Swap, val)
    }

    #[inline(always)]
    fn compare_exchange(word: &MachineWord, expected: i32, new: i32) -> i32 {
        compare_exchange(word, expected, new)
    }
}

#[cfg(not(los_host))]
#[inline(always)]
fn attempt(word: &MachineWord, op: RmwOp, val: i32) -> Attempt {
    use core::arch::asm;

    let ptr = word.as_ptr();
    let old: i32;
    let status: u32;
    // SAFETY: `ptr` comes from a live, aligned AtomicI32 and each block only
    // touches that word. The missing `nomem` makes every block a compiler
    // barrier, matching the memory clobber exclusive sequences need.
    unsafe {
        match op {
            RmwOp::Add => asm!(
                "ldrex {old}, [{ptr}]",
                "add {new}, {old}, {val}",
                "strex {status}, {new}, [{ptr}]",
                ptr = in(reg) ptr,
                val = in(reg) val,
                old = out(reg) old,
                new = out(reg) _,
                status = out(reg) status,
                options(nostack),
            ),
            RmwOp::Or => asm!(
                "ldrex {old}, [{ptr}]",
                "orr {new}, {old}, {val}",
                "strex {status}, {new}, [{ptr}]",
                ptr = in(reg) ptr,
                val = in(reg) val,
                old = out(reg) old,
                new = out(reg) _,
                status = out(reg) status,
                options(nostack),
            ),
            RmwOp::And => asm!(
                "ldrex {old}, [{ptr}]",
                "and {new}, {old}, {val}",
                "strex {status}, {new}, [{ptr}]",
                ptr = in(reg) ptr,
                val = in(reg) val,
                old = out(reg) old,
                new = out(reg) _,
                status = out(reg) status,
                options(nostack),
            ),
            RmwOp::Swap => asm!(
                "ldrex {old}, [{ptr}]",
                "strex {status}, {val}, [{ptr}]",
                ptr = in(reg) ptr,
                val = in(reg) val,
                old = out(reg) old,
                status = out(reg) status,
                options(nostack),
            ),
        }
    }

    if status == 0 { Attempt::Done(old) } else { Attempt::Interrupted }
}

/// ARM state: conditional `strexeq`.
#[cfg(all(not(los_host), not(los_thumb)))]
#[inline(always)]
fn attempt_compare(word: &MachineWord, expected: i32, new: i32) -> Attempt {
    let ptr = word.as_ptr();
    let old: i32;
    let status: u32;
    // SAFETY: as in `attempt`
    unsafe {
        core::arch::asm!(
            "ldrex {old}, [{ptr}]",
            "mov {status}, #0",
            "teq {old}, {expected}",
            "strexeq {status}, {new}, [{ptr}]",
            ptr = in(reg) ptr,
            expected = in(reg) expected,
            new = in(reg) new,
            old = out(reg) old,
            status = out(reg) status,
            options(nostack),
        );
    }

    if status == 0 { Attempt::Done(old) } else { Attempt::Interrupted }
}

/// Thumb state: branch over the `strex`, there is no implicit IT block.
#[cfg(los_thumb)]
#[inline(always)]
fn attempt_compare(word: &MachineWord, expected: i32, new: i32) -> Attempt {
    let ptr = word.as_ptr();
    let old: i32;
    let status: u32;
    // SAFETY: as in `attempt`
    unsafe {
        core::arch::asm!(
            "ldrex {old}, [{ptr}]",
            "mov {status}, #0",
            "teq {old}, {expected}",
            "bne 2f",
            "strex {status}, {new}, [{ptr}]",
            "2:",
            ptr = in(reg) ptr,
            expected = in(reg) expected,
            new = in(reg) new,
            old = out(reg) old,
            status = out(reg) status,
            options(nostack),
        );
    }

    if status == 0 { Attempt::Done(old) } else { Attempt::Interrupted }
}

#[cfg(los_host)]
#[inline(always)]
fn attempt(word: &MachineWord, op: RmwOp, val: i32) -> Attempt {
    use core::sync::atomic::Ordering::Relaxed;

    let old = word.load(Relaxed);
    match word.compare_exchange_weak(old, op.apply(old, val), Relaxed, Relaxed) {
        Ok(_) => Attempt::Done(old),
        Err(_) => Attempt::Interrupted,
    }
}

#[cfg(los_host)]
#[inline(always)]
fn attempt_compare(word: &MachineWord, expected: i32, new: i32) -> Attempt {
    use core::sync::atomic::Ordering::Relaxed;

    let old = word.load(Relaxed);
    if old != expected {
        return Attempt::Done(old);
    }
    match word.compare_exchange_weak(old, new, Relaxed, Relaxed) {
        Ok(_) => Attempt::Done(old),
        Err(_) => Attempt::Interrupted,
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use core::sync::atomic::{fence, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_mismatch_finishes_without_store() {
        let word = MachineWord::new(41);
        assert_eq!(Exclusive::compare_exchange(&word, 40, 0), 41);
        assert_eq!(word.load(Ordering::Relaxed), 41);
    }

    #[test]
    fn test_compare_exchange_as_lock() {
        let word = Arc::new(MachineWord::new(0));
        let counter = Arc::new(MachineWord::new(0));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let word = Arc::clone(&word);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        while Exclusive::compare_exchange(&word, 0, 1) != 0 {
                            core::hint::spin_loop();
                        }
                        fence(Ordering::Acquire);
                        // Non-atomic read-then-write, serialised by the lock word.
                        let seen = counter.load(Ordering::Relaxed);
                        counter.store(seen + 1, Ordering::Relaxed);
                        fence(Ordering::Release);
                        assert_eq!(Exclusive::swap(&word, 0), 1);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 8_000);
    }
}
