//! TEAM_500: ISA variant table.
//!
//! Maps each supported ARM instruction-set generation to the strategy every
//! primitive uses on it. The table is consumed twice: by `build.rs`, which
//! turns the selected row into `cfg` flags, and by the crate itself so the
//! choice can be reported at run time. It must stay free of crate-internal
//! dependencies for that reason.

use core::fmt;
use core::str::FromStr;

use los_error::define_kernel_error;

define_kernel_error! {
    /// Failures while choosing an ISA variant for a build.
    pub enum IsaError(0x01) {
        /// The target's CPU generation has no row in the table.
        Unported = 0x01 => "target CPU generation has no ported strategy",
        /// More than one `isa-*` feature is enabled.
        Conflicting = 0x02 => "more than one ISA variant selected",
        /// A variant name did not match any row.
        UnknownName = 0x03 => "unknown ISA variant name",
    }
}

/// Supported instruction-set generations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IsaVariant {
    /// ARMv5TE in ARM or Thumb-1 state. No exclusive monitor.
    ArmV5,
    /// ARMv6K in ARM state.
    ArmV6,
    /// ARMv6 built for Thumb-1 state, where `ldrex`/`strex`/`mrc` have no encoding.
    ArmV6Thumb,
    /// ARMv7-A.
    ArmV7A,
    /// ARMv7-R.
    ArmV7R,
    /// ARMv7-M / ARMv7E-M.
    ArmV7M,
    /// ARMv8-A running AArch32.
    ArmV8A,
}

/// How the atomic engine is realised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AtomicStrategy {
    /// Compiler-provided atomic intrinsics.
    Native,
    /// Inline `ldrex`/`strex` retry loop.
    Exclusive,
    /// Calls into exported A32 routines.
    OutOfLine,
}

/// How interrupt masking is realised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IrqPath {
    /// Inline `cpsie`/`cpsid`, query through CPSR.
    Cps,
    /// PRIMASK/FAULTMASK on M-profile cores.
    CortexM,
    /// Calls into exported A32 routines.
    OutOfLine,
}

/// Where the current-thread pointer lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextBacking {
    /// TPIDRPRW, banked per core.
    Register,
    /// One process-wide variable. Single-core configurations only.
    Variable,
}

/// Which free-running cycle counter exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CycleHardware {
    /// Performance monitor `PMCCNTR`.
    Pmu,
    /// Data watchpoint and trace `CYCCNT`.
    Dwt,
    /// No counter; reads return zero.
    Absent,
}

impl IsaVariant {
    /// Every supported variant, oldest first.
    pub const ALL: [IsaVariant; 7] = [
        Self::ArmV5,
        Self::ArmV6,
        Self::ArmV6Thumb,
        Self::ArmV7A,
        Self::ArmV7R,
        Self::ArmV7M,
        Self::ArmV8A,
    ];

    /// Short name, also the suffix of the matching `isa-*` Cargo feature.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ArmV5 => "armv5",
            Self::ArmV6 => "armv6",
            Self::ArmV6Thumb => "armv6-thumb",
            Self::ArmV7A => "armv7a",
            Self::ArmV7R => "armv7r",
            Self::ArmV7M => "armv7m",
            Self::ArmV8A => "armv8a",
        }
    }

    /// How atomics are realised on this variant.
    pub const fn atomic_strategy(self) -> AtomicStrategy {
        match self {
            Self::ArmV5 | Self::ArmV6Thumb => AtomicStrategy::OutOfLine,
            Self::ArmV6 | Self::ArmV7A | Self::ArmV7R | Self::ArmV7M => AtomicStrategy::Exclusive,
            Self::ArmV8A => AtomicStrategy::Native,
        }
    }

    /// How interrupts are masked on this variant.
    pub const fn irq_path(self) -> IrqPath {
        match self {
            Self::ArmV5 | Self::ArmV6Thumb => IrqPath::OutOfLine,
            Self::ArmV6 | Self::ArmV7A | Self::ArmV7R | Self::ArmV8A => IrqPath::Cps,
            Self::ArmV7M => IrqPath::CortexM,
        }
    }

    /// Where the current-thread pointer lives on this variant.
    pub const fn context_backing(self) -> ContextBacking {
        match self {
            Self::ArmV6 | Self::ArmV7A | Self::ArmV7R | Self::ArmV8A => ContextBacking::Register,
            Self::ArmV5 | Self::ArmV6Thumb | Self::ArmV7M => ContextBacking::Variable,
        }
    }

    /// Which cycle counter this variant has.
    pub const fn cycle_hardware(self) -> CycleHardware {
        match self {
            Self::ArmV7A | Self::ArmV7R | Self::ArmV8A => CycleHardware::Pmu,
            Self::ArmV7M => CycleHardware::Dwt,
            Self::ArmV5 | Self::ArmV6 | Self::ArmV6Thumb => CycleHardware::Absent,
        }
    }

    /// Whether the core implements `ldrex`/`strex` in some instruction state.
    pub const fn has_exclusive_monitor(self) -> bool {
        !matches!(self, Self::ArmV5)
    }

    /// Derive the variant from a target triple, as found in `TARGET`.
    ///
    /// Only the architecture component (before the first `-`) is looked at.
    /// M-profile cores other than ARMv7-M, and anything older than ARMv5TE,
    /// are rejected instead of falling back to a neighbouring row.
    pub fn from_target_triple(triple: &str) -> Result<Self, IsaError> {
        let arch = triple.split('-').next().unwrap_or(triple);
        let (thumb, generation) = if let Some(rest) = arch.strip_prefix("thumb") {
            (true, rest)
        } else if let Some(rest) = arch.strip_prefix("armeb") {
            (false, rest)
        } else if let Some(rest) = arch.strip_prefix("arm") {
            (false, rest)
        } else {
            return Err(IsaError::Unported);
        };

        match (thumb, generation) {
            (_, "v5te") => Ok(Self::ArmV5),
            (false, "" | "v6" | "v6k") => Ok(Self::ArmV6),
            (true, "v6" | "v6k") => Ok(Self::ArmV6Thumb),
            (_, "v7" | "v7a" | "v7neon" | "v7s" | "v7k") => Ok(Self::ArmV7A),
            (false, "v7r") => Ok(Self::ArmV7R),
            (true, "v7m" | "v7em") => Ok(Self::ArmV7M),
            (false, "v8r" | "v8a") => Ok(Self::ArmV8A),
            _ => Err(IsaError::Unported),
        }
    }

    /// Resolve at most one explicitly requested variant.
    pub fn from_overrides<I>(requested: I) -> Result<Option<Self>, IsaError>
    where
        I: IntoIterator<Item = Self>,
    {
        let mut chosen = None;
        for variant in requested {
            match chosen {
                Some(existing) if existing != variant => return Err(IsaError::Conflicting),
                _ => chosen = Some(variant),
            }
        }
        Ok(chosen)
    }
}

/// `true` when `triple` compiles to Thumb state by default (`thumb*` triples).
pub fn is_thumb_triple(triple: &str) -> bool {
    triple.starts_with("thumb")
}

impl FromStr for IsaVariant {
    type Err = IsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let name = name.strip_prefix("isa-").unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|variant| variant.name().eq_ignore_ascii_case(name))
            .ok_or(IsaError::UnknownName)
    }
}

impl fmt::Display for IsaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_total() {
        for variant in IsaVariant::ALL {
            let strategy = variant.atomic_strategy();
            let irq = variant.irq_path();
            // Out-of-line atomics and out-of-line masking come as a pair.
            assert_eq!(
                strategy == AtomicStrategy::OutOfLine,
                irq == IrqPath::OutOfLine,
                "{variant}"
            );
            assert_eq!(variant.name().parse::<IsaVariant>(), Ok(variant));
        }
    }

    #[test]
    fn test_register_backing_only_with_exclusive_monitor() {
        for variant in IsaVariant::ALL {
            if variant.context_backing() == ContextBacking::Register {
                assert!(variant.has_exclusive_monitor(), "{variant}");
                assert_ne!(variant.irq_path(), IrqPath::OutOfLine, "{variant}");
            }
        }
    }

    /// Every triple rustc ships for a ported generation, with its row.
    const PORTED_TRIPLES: &[(&str, IsaVariant)] = &[
        ("armv5te-none-eabi", IsaVariant::ArmV5),
        ("armv5te-unknown-linux-gnueabi", IsaVariant::ArmV5),
        ("thumbv5te-none-eabi", IsaVariant::ArmV5),
        ("arm-unknown-linux-gnueabi", IsaVariant::ArmV6),
        ("arm-unknown-linux-gnueabihf", IsaVariant::ArmV6),
        ("armv6-unknown-freebsd", IsaVariant::ArmV6),
        ("armv6k-nintendo-3ds", IsaVariant::ArmV6),
        ("armv7-unknown-linux-gnueabihf", IsaVariant::ArmV7A),
        ("armv7a-none-eabi", IsaVariant::ArmV7A),
        ("armv7a-none-eabihf", IsaVariant::ArmV7A),
        ("thumbv7neon-unknown-linux-gnueabihf", IsaVariant::ArmV7A),
        ("thumbv7a-pc-windows-msvc", IsaVariant::ArmV7A),
        ("armv7r-none-eabi", IsaVariant::ArmV7R),
        ("armebv7r-none-eabihf", IsaVariant::ArmV7R),
        ("thumbv7m-none-eabi", IsaVariant::ArmV7M),
        ("thumbv7em-none-eabi", IsaVariant::ArmV7M),
        ("thumbv7em-none-eabihf", IsaVariant::ArmV7M),
        ("armv8r-none-eabihf", IsaVariant::ArmV8A),
    ];

    #[test]
    fn test_detects_real_triples() {
        for &(triple, expected) in PORTED_TRIPLES {
            assert_eq!(IsaVariant::from_target_triple(triple), Ok(expected), "{triple}");
        }
    }

    #[test]
    fn test_rejects_unported_generations() {
        for triple in [
            "armv4t-none-eabi",
            "armv4t-unknown-linux-gnueabi",
            "thumbv4t-none-eabi",
            "thumbv6m-none-eabi",
            "thumbv8m.base-none-eabi",
            "thumbv8m.main-none-eabi",
            "thumbv8m.main-none-eabihf",
            "aarch64-unknown-none",
            "x86_64-unknown-linux-gnu",
        ] {
            assert_eq!(
                IsaVariant::from_target_triple(triple),
                Err(IsaError::Unported),
                "{triple}"
            );
        }
    }

    #[test]
    fn test_thumb_state_follows_triple_prefix() {
        assert!(is_thumb_triple("thumbv7em-none-eabihf"));
        assert!(is_thumb_triple("thumbv7neon-unknown-linux-gnueabihf"));
        assert!(is_thumb_triple("thumbv5te-none-eabi"));
        assert!(!is_thumb_triple("armv7a-none-eabi"));
        assert!(!is_thumb_triple("arm-unknown-linux-gnueabi"));
    }

    #[test]
    fn test_overrides() {
        assert_eq!(IsaVariant::from_overrides([]), Ok(None));
        assert_eq!(
            IsaVariant::from_overrides([IsaVariant::ArmV5]),
            Ok(Some(IsaVariant::ArmV5))
        );
        assert_eq!(
            IsaVariant::from_overrides([IsaVariant::ArmV5, IsaVariant::ArmV7M]),
            Err(IsaError::Conflicting)
        );
    }

    #[test]
    fn test_parse_accepts_feature_names() {
        assert_eq!("isa-armv6-thumb".parse::<IsaVariant>(), Ok(IsaVariant::ArmV6Thumb));
        assert_eq!(" ARMv7M ".parse::<IsaVariant>(), Ok(IsaVariant::ArmV7M));
        assert_eq!("armv4t".parse::<IsaVariant>(), Err(IsaError::UnknownName));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(IsaError::Unported.code(), 0x0101);
        assert_eq!(
            std::format!("{}", IsaError::Conflicting),
            "E0102: more than one ISA variant selected"
        );
    }
}
