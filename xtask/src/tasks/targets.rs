//! Cross targets the crate is checked against.

use los_arch_arm::IsaVariant;

pub struct TargetCase {
    pub triple: &'static str,
    /// Variant the build script must pick, or `None` if it must refuse the target.
    pub expect: Option<IsaVariant>,
    /// Tier-3 target without a prebuilt `core`; checked with nightly `-Zbuild-std`.
    pub build_std: bool,
}

const fn case(triple: &'static str, expect: Option<IsaVariant>, build_std: bool) -> TargetCase {
    TargetCase { triple, expect, build_std }
}

pub const TARGETS: &[TargetCase] = &[
    case("armv5te-unknown-linux-gnueabi", Some(IsaVariant::ArmV5), false),
    case("thumbv5te-none-eabi", Some(IsaVariant::ArmV5), true),
    case("arm-unknown-linux-gnueabi", Some(IsaVariant::ArmV6), false),
    case("armv7a-none-eabi", Some(IsaVariant::ArmV7A), false),
    case("thumbv7neon-unknown-linux-gnueabihf", Some(IsaVariant::ArmV7A), false),
    case("armv7r-none-eabi", Some(IsaVariant::ArmV7R), false),
    case("thumbv7m-none-eabi", Some(IsaVariant::ArmV7M), false),
    case("thumbv7em-none-eabihf", Some(IsaVariant::ArmV7M), false),
    case("armv8r-none-eabihf", Some(IsaVariant::ArmV8A), true),
    case("armv4t-none-eabi", None, true),
    case("thumbv6m-none-eabi", None, false),
    case("thumbv8m.base-none-eabi", None, false),
    case("thumbv8m.main-none-eabi", None, false),
];

pub fn find(triple: &str) -> Option<&'static TargetCase> {
    TARGETS.iter().find(|case| case.triple == triple)
}
