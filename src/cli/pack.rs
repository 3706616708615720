//! Cell and pack CLI arguments.

use clap::Parser;

use crate::{
    cli::ocv::OcvSourceArgs,
    core::{CellParameters, Pack},
    prelude::*,
    quantity::{AmpHours, Celsius, JoulesPerKelvin, KelvinsPerWatt, Ohms},
};

#[must_use]
#[derive(Parser)]
pub struct PackArgs {
    /// Nominal capacity of a single cell in ampere-hours.
    #[clap(long = "cell-capacity-amp-hours", default_value = "2.5", env = "CELL_CAPACITY_AMP_HOURS")]
    pub capacity: AmpHours,

    /// Internal resistance of a single cell in ohms.
    #[clap(
        long = "cell-internal-resistance-ohms",
        default_value = "0.05",
        env = "CELL_INTERNAL_RESISTANCE_OHMS"
    )]
    pub internal_resistance: Ohms,

    /// Lumped thermal capacitance of a single cell in joules per kelvin.
    #[clap(
        long = "cell-thermal-capacitance",
        default_value = "200",
        env = "CELL_THERMAL_CAPACITANCE"
    )]
    pub thermal_capacitance: JoulesPerKelvin,

    /// Thermal resistance to ambient of a single cell in kelvins per watt.
    #[clap(long = "cell-thermal-resistance", default_value = "0.5", env = "CELL_THERMAL_RESISTANCE")]
    pub thermal_resistance: KelvinsPerWatt,

    /// Initial state of charge of every cell, from 0 to 1.
    #[clap(long = "initial-soc", default_value = "0.9", env = "INITIAL_SOC")]
    pub initial_state_of_charge: f64,

    /// Initial temperature of every cell in degrees Celsius.
    #[clap(long = "initial-temperature", default_value = "25", env = "INITIAL_TEMPERATURE")]
    pub initial_temperature: Celsius,

    #[clap(flatten)]
    pub ocv: OcvSourceArgs,
}

impl PackArgs {
    pub fn build_pack(&self) -> Result<Pack> {
        let parameters = CellParameters::builder()
            .capacity(self.capacity)
            .internal_resistance(self.internal_resistance)
            .thermal_capacitance(self.thermal_capacitance)
            .thermal_resistance(self.thermal_resistance)
            .build()?;
        Pack::builder()
            .parameters(parameters)
            .ocv(self.ocv.load()?)
            .initial_state_of_charge(self.initial_state_of_charge)
            .initial_temperature(self.initial_temperature)
            .build()
    }
}
