#![cfg_attr(not(feature = "std"), no_std)]

// TEAM_500: AArch32 architecture primitives.
// Four independent leaves used by the scheduler and lock code: atomic
// read-modify-write, interrupt masking, the current-thread pointer and the
// cycle counter. build.rs picks one strategy per leaf from the ISA table and
// exposes it as cfg flags; each module routes its free functions through a
// `Selected` alias for that strategy.

#[cfg(not(any(los_atomics = "native", los_atomics = "exclusive", los_atomics = "outline")))]
compile_error!("los_arch_arm must be built through its build script");

pub mod atomic;
pub mod context;
pub mod cpu;
pub mod cycle;
pub mod interrupts;
pub mod isa;
#[cfg(any(los_host, los_atomics = "outline", los_irq = "outline"))]
pub mod outline;

pub use atomic::{AtomicEngine, MachineWord};
pub use context::{Thread, current_thread, set_current_thread};
pub use interrupts::InterruptState;
pub use isa::{AtomicStrategy, ContextBacking, CycleHardware, IrqPath, IsaError, IsaVariant};

include!(concat!(env!("OUT_DIR"), "/selected_isa.rs"));

/// Bring up the parts that need it (the cycle counter) and report the
/// configuration. Call once per core during early boot.
pub fn init() {
    cycle::enable();
    log::info!(
        "[ARCH] {} atomics={:?} irq={:?} context={:?} cycles={:?}{}",
        SELECTED_ISA,
        atomic::STRATEGY,
        SELECTED_ISA.irq_path(),
        context::BACKING,
        cycle::HARDWARE,
        if HOST_SIMULATION { " (host simulation)" } else { "" }
    );
    log::debug!("[ARCH] cycle counter present={}", cycle::is_present());
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_selected_rows_agree() {
        assert_eq!(atomic::STRATEGY, SELECTED_ISA.atomic_strategy());
        assert_eq!(context::BACKING, SELECTED_ISA.context_backing());
        assert_eq!(cycle::HARDWARE, SELECTED_ISA.cycle_hardware());
        assert!(HOST_SIMULATION);
    }

    #[test]
    fn test_init_starts_cycle_counter() {
        init();
        if cycle::is_present() {
            let first = cycle::read();
            let second = cycle::read();
            assert!(cycle::elapsed(first, second) > 0);
        } else {
            assert_eq!(cycle::read(), 0);
        }
    }
}
