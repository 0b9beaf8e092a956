// TEAM_500: Conformance suite for every atomic engine and both context backings.
// Run with: cargo test -p los_arch_arm --features std --test conformance

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use los_arch_arm::atomic::{AtomicEngine, Exclusive, MachineWord, Native, OutOfLine};
use los_arch_arm::context::{ContextStorage, CpuRegister, GlobalVariable, Thread};
use proptest::prelude::*;

const THREADS: usize = 8;
const INCREMENTS: usize = 100_000;

/// Tests: [AT1] concurrent adds never lose an update
fn concurrent_adds<E: AtomicEngine>() {
    let word = Arc::new(MachineWord::new(0));
    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let word = Arc::clone(&word);
            thread::spawn(move || {
                for _ in 0..INCREMENTS {
                    E::add(&word, 1);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(word.load(Ordering::Relaxed), (THREADS * INCREMENTS) as i32);
}

/// Tests: [AT2] compare-exchange returns the observed value and stores only on match
fn compare_exchange_contract<E: AtomicEngine>() {
    let word = MachineWord::new(5);
    assert_eq!(E::compare_exchange(&word, 5, 9), 5);
    assert_eq!(word.load(Ordering::Relaxed), 9);
    assert_eq!(E::compare_exchange(&word, 5, 1), 9);
    assert_eq!(word.load(Ordering::Relaxed), 9);
}

/// Tests: [AT3] swap returns the prior value each time
fn swap_returns_prior<E: AtomicEngine>() {
    let word = MachineWord::new(-7);
    assert_eq!(E::swap(&word, 11), -7);
    assert_eq!(E::swap(&word, 22), 11);
    assert_eq!(word.load(Ordering::Relaxed), 22);
}

/// Tests: [AT4] add wraps, bit operations return the prior value
fn arithmetic_and_bits<E: AtomicEngine>() {
    let word = MachineWord::new(i32::MAX);
    assert_eq!(E::add(&word, 1), i32::MAX);
    assert_eq!(word.load(Ordering::Relaxed), i32::MIN);

    word.store(0b1010, Ordering::Relaxed);
    assert_eq!(E::or(&word, 0b0101), 0b1010);
    assert_eq!(E::and(&word, 0b0110), 0b1111);
    assert_eq!(word.load(Ordering::Relaxed), 0b0110);
}

/// Tests: [AT5] a compare-exchange spin lock built on the engine serialises writers
fn lock_serialises<E: AtomicEngine>() {
    const ROUNDS: usize = 5_000;
    let lock = Arc::new(MachineWord::new(0));
    let shared = Arc::new(MachineWord::new(0));
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    while E::compare_exchange(&lock, 0, 1) != 0 {
                        std::hint::spin_loop();
                    }
                    std::sync::atomic::fence(Ordering::Acquire);
                    let v = shared.load(Ordering::Relaxed);
                    shared.store(v + 1, Ordering::Relaxed);
                    std::sync::atomic::fence(Ordering::Release);
                    E::swap(&lock, 0);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(shared.load(Ordering::Relaxed), (4 * ROUNDS) as i32);
}

macro_rules! engine_suite {
    ($module:ident, $engine:ty) => {
        mod $module {
            use super::*;

            #[test]
            fn test_concurrent_adds() {
                concurrent_adds::<$engine>();
            }

            #[test]
            fn test_compare_exchange_contract() {
                compare_exchange_contract::<$engine>();
            }

            #[test]
            fn test_swap_returns_prior() {
                swap_returns_prior::<$engine>();
            }

            #[test]
            fn test_arithmetic_and_bits() {
                arithmetic_and_bits::<$engine>();
            }

            #[test]
            fn test_lock_serialises() {
                lock_serialises::<$engine>();
            }
        }
    };
}

engine_suite!(native, Native);
engine_suite!(exclusive, Exclusive);
engine_suite!(out_of_line, OutOfLine);

// ----------------------------------------------------------------------------
// Cross-strategy equivalence
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
enum Op {
    Add(i32),
    Or(i32),
    And(i32),
    Swap(i32),
    CompareExchange(i32, i32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<i32>().prop_map(Op::Add),
        any::<i32>().prop_map(Op::Or),
        any::<i32>().prop_map(Op::And),
        any::<i32>().prop_map(Op::Swap),
        // Small operands so compare-exchange actually hits sometimes
        (-4i32..4, any::<i32>()).prop_map(|(e, n)| Op::CompareExchange(e, n)),
    ]
}

/// Apply `ops` through engine `E`; returns every result and the final word.
fn run<E: AtomicEngine>(initial: i32, ops: &[Op]) -> (Vec<i32>, i32) {
    let word = MachineWord::new(initial);
    let results = ops
        .iter()
        .map(|op| match *op {
            Op::Add(v) => E::add(&word, v),
            Op::Or(v) => E::or(&word, v),
            Op::And(v) => E::and(&word, v),
            Op::Swap(v) => E::swap(&word, v),
            Op::CompareExchange(e, n) => E::compare_exchange(&word, e, n),
        })
        .collect();
    (results, word.load(Ordering::Relaxed))
}

/// Plain sequential model of the same operations.
fn model(initial: i32, ops: &[Op]) -> (Vec<i32>, i32) {
    let mut value = initial;
    let results = ops
        .iter()
        .map(|op| {
            let old = value;
            value = match *op {
                Op::Add(v) => old.wrapping_add(v),
                Op::Or(v) => old | v,
                Op::And(v) => old & v,
                Op::Swap(v) => v,
                Op::CompareExchange(e, n) => {
                    if old == e {
                        n
                    } else {
                        old
                    }
                }
            };
            old
        })
        .collect();
    (results, value)
}

proptest! {
    /// Tests: [AT6] all engines agree with the sequential model
    #[test]
    fn engines_agree(initial in -4i32..4, ops in prop::collection::vec(arb_op(), 0..64)) {
        let expected = model(initial, &ops);
        prop_assert_eq!(run::<Native>(initial, &ops), expected.clone());
        prop_assert_eq!(run::<Exclusive>(initial, &ops), expected.clone());
        prop_assert_eq!(run::<OutOfLine>(initial, &ops), expected);
    }

    /// Tests: [AT7] the public free functions route to an engine with the same behaviour
    #[test]
    fn selected_engine_agrees(initial in any::<i32>(), ops in prop::collection::vec(arb_op(), 0..32)) {
        let word = MachineWord::new(initial);
        let results: Vec<i32> = ops
            .iter()
            .map(|op| match *op {
                Op::Add(v) => los_arch_arm::atomic::add(&word, v),
                Op::Or(v) => los_arch_arm::atomic::or(&word, v),
                Op::And(v) => los_arch_arm::atomic::and(&word, v),
                Op::Swap(v) => los_arch_arm::atomic::swap(&word, v),
                Op::CompareExchange(e, n) => los_arch_arm::atomic::compare_exchange(&word, e, n),
            })
            .collect();
        prop_assert_eq!((results, word.load(Ordering::Relaxed)), model(initial, &ops));
    }
}

// ----------------------------------------------------------------------------
// Context backings
// ----------------------------------------------------------------------------

fn thread_ptr(addr: usize) -> *mut Thread {
    addr as *mut Thread
}

/// Tests: [CT1] set then get returns the same pointer, repeatedly
fn context_round_trip<S: ContextStorage>(base: usize) {
    for i in 0..64 {
        let p = thread_ptr(base + i * 0x40);
        unsafe { S::set(p) };
        assert_eq!(S::get(), p);
        assert_eq!(S::get(), p, "reads must not disturb the value");
    }
}

#[test]
fn test_register_context_round_trip() {
    context_round_trip::<CpuRegister>(0x2000_0000);
}

// Only test in this binary that writes the process-wide slot.
#[test]
fn test_variable_context_round_trip() {
    context_round_trip::<GlobalVariable>(0x3000_0000);
}

/// Tests: [CT2] register backing is per core (one host thread per core)
#[test]
fn test_register_context_is_per_core() {
    let cores: Vec<_> = (0..4usize)
        .map(|core| {
            thread::spawn(move || {
                let mine = thread_ptr(0x4000_0000 + core * 0x1000);
                unsafe { CpuRegister::set(mine) };
                thread::yield_now();
                CpuRegister::get() == mine
            })
        })
        .collect();
    for core in cores {
        assert!(core.join().unwrap());
    }
}
