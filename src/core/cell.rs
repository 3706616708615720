use bon::bon;
use serde::Serialize;

use crate::{
    core::{
        error::{ConfigurationError, is_positive},
        ocv::OcvTable,
    },
    prelude::*,
    quantity::{
        AmpHours,
        Amps,
        Celsius,
        JoulesPerKelvin,
        KelvinsPerWatt,
        Ohms,
        Seconds,
        Volts,
        Watts,
    },
};

/// Constant electrical and thermal properties of a single cell.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellParameters {
    pub capacity: AmpHours,
    pub internal_resistance: Ohms,

    /// Lumped thermal capacitance.
    pub thermal_capacitance: JoulesPerKelvin,

    /// Convective thermal resistance to ambient.
    pub thermal_resistance: KelvinsPerWatt,
}

impl Default for CellParameters {
    fn default() -> Self {
        Self {
            capacity: AmpHours(2.5),
            internal_resistance: Ohms(0.05),
            thermal_capacitance: JoulesPerKelvin(200.0),
            thermal_resistance: KelvinsPerWatt(0.5),
        }
    }
}

#[bon]
impl CellParameters {
    #[builder]
    pub fn new(
        #[builder(default = AmpHours(2.5))] capacity: AmpHours,
        #[builder(default = Ohms(0.05))] internal_resistance: Ohms,
        #[builder(default = JoulesPerKelvin(200.0))] thermal_capacitance: JoulesPerKelvin,
        #[builder(default = KelvinsPerWatt(0.5))] thermal_resistance: KelvinsPerWatt,
    ) -> Result<Self> {
        let parameters =
            Self { capacity, internal_resistance, thermal_capacitance, thermal_resistance };
        parameters.validate()?;
        Ok(parameters)
    }
}

impl CellParameters {
    pub fn validate(&self) -> Result {
        ensure!(is_positive(self.capacity.0), ConfigurationError::Capacity { capacity: self.capacity });
        ensure!(
            self.internal_resistance.is_finite() && self.internal_resistance >= Ohms::ZERO,
            ConfigurationError::InternalResistance { resistance: self.internal_resistance },
        );
        ensure!(
            is_positive(self.thermal_capacitance.0),
            ConfigurationError::ThermalCapacitance { capacitance: self.thermal_capacitance },
        );
        ensure!(
            is_positive(self.thermal_resistance.0),
            ConfigurationError::ThermalResistance { resistance: self.thermal_resistance },
        );
        Ok(())
    }

    /// Thermal time constant `R_th · C_th`.
    ///
    /// The explicit Euler thermal update converges monotonically only for time steps not exceeding it.
    pub fn time_constant(&self) -> Seconds {
        self.thermal_resistance * self.thermal_capacitance
    }
}

/// Mutable part of a cell, everything but its parameters.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct CellState {
    /// Terminal voltage as of the last step.
    pub voltage: Volts,

    /// State of charge, `0..=1`.
    pub state_of_charge: f64,

    pub temperature: Celsius,
}

#[must_use]
#[derive(Clone, Debug)]
pub struct Cell {
    parameters: CellParameters,

    /// [`Cell::step`] only produces a provisional state of charge by its own integration.
    /// The SOC estimator overwrites it later in the same control cycle, and that corrected value
    /// is the authoritative one.
    state: CellState,
}

impl Cell {
    pub fn new(
        parameters: CellParameters,
        ocv: &OcvTable,
        state_of_charge: f64,
        temperature: Celsius,
    ) -> Result<Self> {
        parameters.validate()?;
        let voltage = ocv.voltage_at(state_of_charge);
        Ok(Self { parameters, state: CellState { voltage, state_of_charge, temperature } })
    }

    /// Integrate the cell over `dt` under the current, positive for discharge.
    ///
    /// The terminal voltage is computed from the state of charge at the start of the step.
    pub fn step(&mut self, ocv: &OcvTable, current: Amps, dt: Seconds, ambient: Celsius) -> Volts {
        debug_assert!(dt > Seconds::ZERO);

        let temperature = self.next_temperature(current, dt, ambient);

        let state = &mut self.state;
        state.voltage =
            ocv.voltage_at(state.state_of_charge) - current * self.parameters.internal_resistance;

        let charge = AmpHours::from(-(current * dt));
        state.state_of_charge =
            (state.state_of_charge + charge / self.parameters.capacity).clamp(0.0, 1.0);

        state.temperature = temperature;
        state.voltage
    }

    /// Explicit Euler update of the temperature: Joule heating against convection to ambient.
    pub fn next_temperature(&self, current: Amps, dt: Seconds, ambient: Celsius) -> Celsius {
        let heat = self.joule_heating(current);
        let loss = (self.state.temperature - ambient) / self.parameters.thermal_resistance;
        self.state.temperature + (heat - loss) * dt / self.parameters.thermal_capacitance
    }

    pub fn joule_heating(&self, current: Amps) -> Watts {
        current * self.parameters.internal_resistance * current
    }

    pub const fn parameters(&self) -> &CellParameters {
        &self.parameters
    }

    pub const fn state(&self) -> CellState {
        self.state
    }

    /// The parameters stay fixed for the lifetime of the cell, only the state may be overridden.
    pub const fn state_mut(&mut self) -> &mut CellState {
        &mut self.state
    }
}
