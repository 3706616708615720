//! Fixed 2s2p pack: two parallel groups («legs») of two cells each, connected in series.

use bon::bon;

use crate::{
    core::{
        cell::{Cell, CellParameters, CellState},
        error::{ConfigurationError, is_proportion},
        ocv::OcvTable,
    },
    prelude::*,
    quantity::{Amps, Celsius, Seconds, Volts},
};

pub const N_CELLS: usize = 4;

/// Number of cells in a parallel group.
pub const N_PARALLEL: usize = 2;

/// Cell indices of the parallel groups, in series order.
pub const LEGS: [[usize; N_PARALLEL]; 2] = [[0, 1], [2, 3]];

#[must_use]
#[derive(Clone, Debug)]
pub struct Pack {
    cells: [Cell; N_CELLS],
    ocv: OcvTable,
}

#[bon]
impl Pack {
    #[builder]
    pub fn new(
        #[builder(default)] parameters: CellParameters,
        #[builder(default)] ocv: OcvTable,
        #[builder(default = 0.9)] initial_state_of_charge: f64,
        #[builder(default = Celsius(25.0))] initial_temperature: Celsius,
    ) -> Result<Self> {
        ensure!(
            is_proportion(initial_state_of_charge),
            ConfigurationError::StateOfCharge { soc: initial_state_of_charge },
        );
        ensure!(
            initial_temperature.is_finite(),
            ConfigurationError::NonFinite {
                name: "initial temperature",
                value: initial_temperature.0,
            },
        );
        let cell = Cell::new(parameters, &ocv, initial_state_of_charge, initial_temperature)?;
        Ok(Self { cells: std::array::from_fn(|_| cell.clone()), ocv })
    }
}

impl Pack {
    /// Current through every single cell, the pack current is shared evenly within a parallel group.
    #[expect(clippy::cast_precision_loss)]
    pub fn cell_current(pack_current: Amps) -> Amps {
        pack_current / N_PARALLEL as f64
    }

    /// Step every cell under its share of the pack current and return the cell voltages.
    pub fn step(&mut self, pack_current: Amps, dt: Seconds, ambient: Celsius) -> [Volts; N_CELLS] {
        let cell_current = Self::cell_current(pack_current);
        let ocv = &self.ocv;
        self.cells.each_mut().map(|cell| cell.step(ocv, cell_current, dt, ambient))
    }

    /// Sum of the series legs, each leg at the average voltage of its parallel cells.
    #[expect(clippy::cast_precision_loss)]
    pub fn voltage(&self) -> Volts {
        LEGS.iter()
            .map(|leg| {
                leg.iter().map(|&index| self.cells[index].state().voltage).sum::<Volts>() / N_PARALLEL as f64
            })
            .sum()
    }

    pub fn cell_states(&self) -> [CellState; N_CELLS] {
        self.cells.each_ref().map(Cell::state)
    }

    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn average_state_of_charge(&self) -> f64 {
        self.cells.iter().map(|cell| cell.state().state_of_charge).sum::<f64>() / N_CELLS as f64
    }

    pub fn max_temperature(&self) -> Celsius {
        self.cells.iter().map(|cell| cell.state().temperature).max().unwrap_or(Celsius::ZERO)
    }

    /// Smallest thermal time constant across the cells, the bound for a stable time step.
    pub fn min_time_constant(&self) -> Seconds {
        self.cells
            .iter()
            .map(|cell| cell.parameters().time_constant())
            .min()
            .unwrap_or(Seconds::ZERO)
    }

    #[must_use]
    pub const fn cells(&self) -> &[Cell; N_CELLS] {
        &self.cells
    }

    /// Mutable cell states, for the SOC estimator and for fault injection.
    pub fn states_mut(&mut self) -> [&mut CellState; N_CELLS] {
        self.cells.each_mut().map(Cell::state_mut)
    }

    pub const fn ocv(&self) -> &OcvTable {
        &self.ocv
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::quantity::AmpHours;

    #[test]
    fn fresh_pack() {
        let pack = Pack::builder().build().unwrap();
        for state in pack.cell_states() {
            assert_eq!(state.state_of_charge, 0.9);
            assert_eq!(state.temperature, Celsius(25.0));
        }
        assert_abs_diff_eq!(pack.voltage().0, 2.0 * 4.08, epsilon = 1e-12);
    }

    #[test]
    fn splits_current_across_parallel_cells() {
        let mut pack = Pack::builder().build().unwrap();
        let voltages = pack.step(Amps(5.0), Seconds(1.0), Celsius(25.0));
        for voltage in voltages {
            assert_abs_diff_eq!(voltage.0, 4.08 - 2.5 * 0.05, epsilon = 1e-12);
        }
        for state in pack.cell_states() {
            assert_abs_diff_eq!(state.state_of_charge, 0.9 - 2.5 / 9000.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn voltage_averages_legs() {
        let mut pack = Pack::builder().build().unwrap();
        let voltages = [3.0, 4.0, 3.5, 3.7];
        for (state, voltage) in pack.states_mut().into_iter().zip(voltages) {
            state.voltage = Volts(voltage);
        }
        assert_abs_diff_eq!(pack.voltage().0, 3.5 + 3.6, epsilon = 1e-12);
    }

    #[test]
    fn cell_states_do_not_mutate() {
        let mut pack = Pack::builder().build().unwrap();
        let voltages = pack.step(Amps(3.0), Seconds(1.0), Celsius(30.0));
        let first = pack.cell_states();
        let second = pack.cell_states();
        assert_eq!(first, second);
        assert_eq!(first.map(|state| state.voltage), voltages);
    }

    #[test]
    fn aggregates() {
        let mut pack = Pack::builder().build().unwrap();
        pack.states_mut()[2].temperature = Celsius(47.0);
        pack.states_mut()[3].state_of_charge = 0.5;
        assert_eq!(pack.max_temperature(), Celsius(47.0));
        assert_abs_diff_eq!(pack.average_state_of_charge(), 0.8, epsilon = 1e-12);
        assert_eq!(pack.min_time_constant(), Seconds(100.0));
    }

    #[test]
    fn rejects_invalid_initial_state_of_charge() {
        let error = Pack::builder().initial_state_of_charge(1.5).build().unwrap_err();
        assert_eq!(
            error.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::StateOfCharge { soc: 1.5 })
        );
    }

    #[test]
    fn rejects_invalid_parameters() {
        let parameters = CellParameters { capacity: AmpHours::ZERO, ..CellParameters::default() };
        assert!(Pack::builder().parameters(parameters).build().is_err());
    }
}
