use clap::{Parser, Subcommand};
use los_arch_arm::{IsaError, IsaVariant};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "los_arch_arm developer tasks")]
pub struct Cli {
    /// Print a JSON report on stdout instead of the human summary.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Run the host test suite once per ISA variant.
    ///
    /// Each run forces one `isa-*` feature, so the public API is exercised
    /// through that variant's atomic, context and cycle strategies.
    Test {
        /// Only this variant (e.g. `armv7m`, `isa-armv6-thumb`).
        #[arg(long, value_parser = parse_isa)]
        isa: Option<IsaVariant>,
    },

    /// Cross-check every supported target triple.
    ///
    /// Unported triples (ARMv6-M, ARMv8-M) must fail with E0101.
    Check {
        /// Only this target triple.
        #[arg(long)]
        target: Option<String>,
    },

    /// Check that cargo, rustup and the cross targets are installed.
    Doctor,
}

fn parse_isa(s: &str) -> Result<IsaVariant, IsaError> {
    s.parse()
}
