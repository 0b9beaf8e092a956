//! TEAM_500: Current-thread pointer.
//!
//! The scheduler records which thread runs on this core; anything that needs
//! "who am I" reads it back. Two backings:
//!
//! - [`CpuRegister`]: TPIDRPRW, banked per core, no memory access.
//! - [`GlobalVariable`]: one process-wide static for cores without a spare
//!   register. Only valid while the configuration is single-core. Moving such
//!   a target to SMP requires revisiting this storage.
//!
//! Nothing is stored until the scheduler's first [`set_current_thread`];
//! reading before that returns whatever the backing held at reset.

use core::marker::{PhantomData, PhantomPinned};
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::interrupts;
use crate::isa::ContextBacking;

/// Opaque thread control block owned by the scheduler.
#[repr(C)]
pub struct Thread {
    _opaque: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// Storage for the current-thread pointer.
pub trait ContextStorage {
    /// Pointer most recently stored on this core.
    fn get() -> *mut Thread;

    /// # Safety
    /// Normal interrupts must be masked, and `thread` must stay valid until
    /// it is replaced.
    unsafe fn set(thread: *mut Thread);
}

/// TPIDRPRW-backed storage.
#[cfg(any(los_host, los_context = "register"))]
pub struct CpuRegister;

#[cfg(any(los_host, los_context = "register"))]
impl ContextStorage for CpuRegister {
    #[inline(always)]
    fn get() -> *mut Thread {
        crate::cpu::read_tpidrprw() as *mut Thread
    }

    #[inline(always)]
    unsafe fn set(thread: *mut Thread) {
        crate::cpu::write_tpidrprw(thread as usize);
    }
}

static CURRENT: AtomicPtr<Thread> = AtomicPtr::new(core::ptr::null_mut());

/// Process-wide storage. Single-core only.
pub struct GlobalVariable;

impl ContextStorage for GlobalVariable {
    #[inline(always)]
    fn get() -> *mut Thread {
        CURRENT.load(Ordering::Relaxed)
    }

    #[inline(always)]
    unsafe fn set(thread: *mut Thread) {
        CURRENT.store(thread, Ordering::Relaxed);
    }
}

/// Storage chosen for this build.
#[cfg(los_context = "register")]
pub type Selected = CpuRegister;
#[cfg(los_context = "variable")]
pub type Selected = GlobalVariable;

/// Backing behind [`Selected`].
#[cfg(los_context = "register")]
pub const BACKING: ContextBacking = ContextBacking::Register;
#[cfg(los_context = "variable")]
pub const BACKING: ContextBacking = ContextBacking::Variable;

/// Thread currently running on this core.
#[inline(always)]
pub fn current_thread() -> *mut Thread {
    Selected::get()
}

/// Record the thread now running on this core.
///
/// # Safety
/// Normal interrupts must be masked on this core, and `thread` must point to
/// a control block that stays valid until the next call.
#[inline(always)]
pub unsafe fn set_current_thread(thread: *mut Thread) {
    debug_assert!(
        interrupts::normal_is_disabled(),
        "current thread changed with interrupts unmasked"
    );
    Selected::set(thread);
}
