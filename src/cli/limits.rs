use clap::Parser;

use crate::{
    core::Limits,
    prelude::*,
    quantity::{Amps, Celsius, Volts},
};

#[must_use]
#[derive(Copy, Clone, Parser)]
pub struct LimitsArgs {
    #[clap(long = "max-cell-voltage", default_value = "4.25", env = "MAX_CELL_VOLTAGE")]
    pub max_cell_voltage: Volts,

    #[clap(long = "min-cell-voltage", default_value = "2.7", env = "MIN_CELL_VOLTAGE")]
    pub min_cell_voltage: Volts,

    #[clap(long = "max-cell-temperature", default_value = "60", env = "MAX_CELL_TEMPERATURE")]
    pub max_cell_temperature: Celsius,

    #[clap(long = "min-cell-temperature", default_value = "0", env = "MIN_CELL_TEMPERATURE")]
    pub min_cell_temperature: Celsius,

    /// Absolute pack current limit in amperes.
    #[clap(long = "max-pack-current", default_value = "10", env = "MAX_PACK_CURRENT")]
    pub max_pack_current: Amps,

    /// Consecutive cycles a cell condition must hold before the fault is asserted.
    #[clap(long = "fault-persistence", default_value = "3", env = "FAULT_PERSISTENCE")]
    pub persistence: u32,

    /// State-of-charge excess over the pack mean at which a cell is bled.
    #[clap(long = "balance-threshold", default_value = "0.02", env = "BALANCE_THRESHOLD")]
    pub balance_threshold: f64,

    #[clap(long = "cooling-temperature", default_value = "45", env = "COOLING_TEMPERATURE")]
    pub cooling_temperature: Celsius,

    #[clap(long = "emergency-temperature", default_value = "60", env = "EMERGENCY_TEMPERATURE")]
    pub emergency_temperature: Celsius,
}

impl TryFrom<LimitsArgs> for Limits {
    type Error = Error;

    fn try_from(args: LimitsArgs) -> Result<Self> {
        Self::builder()
            .max_cell_voltage(args.max_cell_voltage)
            .min_cell_voltage(args.min_cell_voltage)
            .max_cell_temperature(args.max_cell_temperature)
            .min_cell_temperature(args.min_cell_temperature)
            .max_pack_current(args.max_pack_current)
            .persistence(args.persistence)
            .balance_threshold(args.balance_threshold)
            .cooling_temperature(args.cooling_temperature)
            .emergency_temperature(args.emergency_temperature)
            .build()
    }
}
