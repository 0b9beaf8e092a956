//! TEAM_500: Error definitions for the architecture crates.
//!
//! The primitives in `los_arch_arm` have no run-time error states; every
//! failure this workspace can report happens while a build is being
//! configured (picking an ISA variant for a target). Those failures still get
//! stable numeric codes so build logs and `xtask` reports can be grepped.
//!
//! ## Usage
//!
//! ### Simple errors
//! ```ignore
//! define_kernel_error! {
//!     pub enum IsaError(0x01) {
//!         Unported = 0x01 => "target CPU generation has no ported strategy",
//!         Conflicting = 0x02 => "more than one ISA variant selected",
//!     }
//! }
//! ```
//!
//! ### Wrapping another error
//! ```ignore
//! define_kernel_error! {
//!     pub enum BuildError(0x02) {
//!         Isa(IsaError) = 0x01 => "ISA selection failed",
//!     }
//! }
//! ```

#![no_std]

/// Define an error enum with a subsystem id, per-variant codes and a
/// description string.
///
/// Variants may carry one inner error, which is appended to the `Display`
/// output.
#[macro_export]
macro_rules! define_kernel_error {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident($subsystem:literal) {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(($inner:ty))? = $code:literal => $desc:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $(($inner))?,
            )*
        }

        impl $name {
            /// Subsystem identifier, the high byte of every code.
            pub const SUBSYSTEM: u8 = $subsystem;

            /// Numeric error code: subsystem in the high byte, variant in the low byte.
            pub const fn code(&self) -> u16 {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? _unused) => {
                            (($subsystem as u16) << 8) | $code
                        }
                    )*
                }
            }

            /// Human-readable description.
            pub const fn name(&self) -> &'static str {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? _unused) => {
                            $desc
                        }
                    )*
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? inner) => {
                            $crate::define_kernel_error!(@display_body self f $desc $(($inner))? inner)
                        }
                    )*
                }
            }
        }

        impl core::error::Error for $name {}
    };

    (@pattern $variant:ident ($inner:ty) $bind:ident) => { Self::$variant($bind) };
    (@pattern $variant:ident $bind:ident) => { Self::$variant };

    (@display_body $self:ident $f:ident $desc:literal ($inner:ty) $bind:ident) => {
        write!($f, "E{:04X}: {} ({})", $self.code(), $desc, $bind)
    };
    (@display_body $self:ident $f:ident $desc:literal $bind:ident) => {
        write!($f, "E{:04X}: {}", $self.code(), $desc)
    };
}
