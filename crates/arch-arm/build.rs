// TEAM_500: Selects the ISA variant for this build and turns its table row
// into cfg flags. Every supported target resolves to exactly one row; anything
// else stops the build here.

use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

#[allow(dead_code)]
#[path = "src/isa.rs"]
mod isa;

use isa::{AtomicStrategy, ContextBacking, CycleHardware, IrqPath, IsaError, IsaVariant};

/// Variant simulated on non-ARM hosts when no `isa-*` feature is set.
const HOST_DEFAULT: IsaVariant = IsaVariant::ArmV7A;

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo::rerun-if-changed=build.rs");
    println!("cargo::rerun-if-changed=src/isa.rs");
    declare_cfgs();

    let requested = IsaVariant::from_overrides(
        IsaVariant::ALL
            .into_iter()
            .filter(|variant| feature_enabled(&format!("isa-{}", variant.name()))),
    )
    .map_err(|e| describe(e, "enable at most one isa-* feature"))?;

    let triple = env::var("TARGET")?;
    let host = env::var("CARGO_CFG_TARGET_ARCH")? != "arm";
    let variant = match (requested, host) {
        (Some(variant), _) => variant,
        (None, true) => HOST_DEFAULT,
        (None, false) => IsaVariant::from_target_triple(&triple)
            .map_err(|e| describe(e, &format!("target {triple}")))?,
    };

    if host {
        println!("cargo::rustc-cfg=los_host");
    } else if isa::is_thumb_triple(&triple) {
        println!("cargo::rustc-cfg=los_thumb");
    }
    emit_cfgs(variant);
    write_selected(variant, host)?;
    Ok(())
}

fn declare_cfgs() {
    println!("cargo::rustc-check-cfg=cfg(los_host)");
    println!("cargo::rustc-check-cfg=cfg(los_thumb)");
    println!("cargo::rustc-check-cfg=cfg(los_exclusive_monitor)");
    let isas: Vec<String> = IsaVariant::ALL
        .iter()
        .map(|v| format!("\"{}\"", v.name()))
        .collect();
    println!("cargo::rustc-check-cfg=cfg(los_isa, values({}))", isas.join(", "));
    println!("cargo::rustc-check-cfg=cfg(los_atomics, values(\"native\", \"exclusive\", \"outline\"))");
    println!("cargo::rustc-check-cfg=cfg(los_irq, values(\"cps\", \"cortex_m\", \"outline\"))");
    println!("cargo::rustc-check-cfg=cfg(los_context, values(\"register\", \"variable\"))");
    println!("cargo::rustc-check-cfg=cfg(los_cycle, values(\"pmu\", \"dwt\", \"absent\"))");
}

fn emit_cfgs(variant: IsaVariant) {
    let atomics = match variant.atomic_strategy() {
        AtomicStrategy::Native => "native",
        AtomicStrategy::Exclusive => "exclusive",
        AtomicStrategy::OutOfLine => "outline",
    };
    let irq = match variant.irq_path() {
        IrqPath::Cps => "cps",
        IrqPath::CortexM => "cortex_m",
        IrqPath::OutOfLine => "outline",
    };
    let context = match variant.context_backing() {
        ContextBacking::Register => "register",
        ContextBacking::Variable => "variable",
    };
    let cycle = match variant.cycle_hardware() {
        CycleHardware::Pmu => "pmu",
        CycleHardware::Dwt => "dwt",
        CycleHardware::Absent => "absent",
    };

    println!("cargo::rustc-cfg=los_isa=\"{}\"", variant.name());
    println!("cargo::rustc-cfg=los_atomics=\"{atomics}\"");
    println!("cargo::rustc-cfg=los_irq=\"{irq}\"");
    println!("cargo::rustc-cfg=los_context=\"{context}\"");
    println!("cargo::rustc-cfg=los_cycle=\"{cycle}\"");
    if variant.has_exclusive_monitor() {
        println!("cargo::rustc-cfg=los_exclusive_monitor");
    }
}

fn write_selected(variant: IsaVariant, host: bool) -> Result<(), Box<dyn Error>> {
    let out = PathBuf::from(env::var("OUT_DIR")?).join("selected_isa.rs");
    let source = format!(
        "/// ISA variant this build was configured for.\n\
         pub const SELECTED_ISA: IsaVariant = IsaVariant::{variant:?};\n\
         /// `true` when CPU registers are simulated on a non-ARM host.\n\
         pub const HOST_SIMULATION: bool = {host};\n"
    );
    fs::write(out, source)?;
    Ok(())
}

fn feature_enabled(feature: &str) -> bool {
    let var = format!(
        "CARGO_FEATURE_{}",
        feature.to_ascii_uppercase().replace('-', "_")
    );
    env::var_os(var).is_some()
}

fn describe(err: IsaError, detail: &str) -> Box<dyn Error> {
    format!("los_arch_arm: {err} ({detail})").into()
}
