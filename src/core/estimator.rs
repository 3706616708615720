//! Coulomb-counting SOC estimator with voltage-based drift correction.

use bon::bon;

use crate::{
    core::{
        error::{ConfigurationError, is_proportion},
        pack::{N_CELLS, Pack},
    },
    prelude::*,
    quantity::{Amps, Coulombs, Seconds},
};

pub const DEFAULT_CORRECTION_GAIN: f64 = 0.02;

#[must_use]
#[derive(Clone, Debug)]
pub struct SocEstimator {
    /// Independent charge ledger per cell.
    remaining_charge: [Coulombs; N_CELLS],

    /// Weight of the voltage-implied state of charge in the blend, `0..=1`.
    correction_gain: f64,
}

#[bon]
impl SocEstimator {
    /// Seed the ledger from the current cell charge.
    #[builder]
    pub fn new(
        pack: &Pack,
        #[builder(default = DEFAULT_CORRECTION_GAIN)] correction_gain: f64,
    ) -> Result<Self> {
        ensure!(is_proportion(correction_gain), ConfigurationError::CorrectionGain { gain: correction_gain });
        let remaining_charge = pack.cells().each_ref().map(|cell| {
            Coulombs::from(cell.parameters().capacity) * cell.state().state_of_charge
        });
        Ok(Self { remaining_charge, correction_gain })
    }
}

impl SocEstimator {
    /// Run the coulomb count and then the voltage correction, in this order.
    ///
    /// Must run after [`Pack::step`] within the same cycle: the correction reads the fresh cell
    /// voltages. The written state of charge supersedes the one integrated by the pack.
    pub fn step(&mut self, pack: &mut Pack, pack_current: Amps, dt: Seconds) -> [f64; N_CELLS] {
        self.coulomb_count_step(pack, pack_current, dt);
        self.voltage_correction(pack);
        pack.cell_states().map(|state| state.state_of_charge)
    }

    /// Debit the ledger and overwrite the cell state of charge from it.
    pub fn coulomb_count_step(&mut self, pack: &mut Pack, pack_current: Amps, dt: Seconds) {
        let cell_current = Pack::cell_current(pack_current);
        let capacities =
            pack.cells().each_ref().map(|cell| Coulombs::from(cell.parameters().capacity));
        for ((remaining_charge, capacity), state) in
            self.remaining_charge.iter_mut().zip(capacities).zip(pack.states_mut())
        {
            *remaining_charge -= cell_current * dt;
            state.state_of_charge = (*remaining_charge / capacity).clamp(0.0, 1.0);
        }
    }

    /// Nudge every cell state of charge towards the one implied by its terminal voltage.
    ///
    /// The ledger is left untouched, so the correction does not accumulate across cycles.
    pub fn voltage_correction(&self, pack: &mut Pack) {
        let implied = pack.cell_states().map(|state| pack.ocv().state_of_charge_at(state.voltage));
        for (state, implied) in pack.states_mut().into_iter().zip(implied) {
            state.state_of_charge = ((1.0 - self.correction_gain) * state.state_of_charge
                + self.correction_gain * implied)
                .clamp(0.0, 1.0);
        }
    }

    #[must_use]
    pub const fn remaining_charge(&self) -> &[Coulombs; N_CELLS] {
        &self.remaining_charge
    }

    #[must_use]
    pub const fn correction_gain(&self) -> f64 {
        self.correction_gain
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::quantity::{Celsius, Volts};

    #[test]
    fn seeds_ledger_from_pack() {
        let pack = Pack::builder().build().unwrap();
        let estimator = SocEstimator::builder().pack(&pack).build().unwrap();
        for charge in estimator.remaining_charge() {
            assert_abs_diff_eq!(charge.0, 2.5 * 3600.0 * 0.9, epsilon = 1e-9);
        }
        assert_eq!(estimator.correction_gain(), 0.02);
    }

    #[test]
    fn coulomb_counting_alone_conserves_charge() {
        let mut pack = Pack::builder().build().unwrap();
        let mut estimator = SocEstimator::builder().pack(&pack).correction_gain(0.0).build().unwrap();
        for _ in 0..300 {
            let _ = pack.step(Amps(5.0), Seconds(1.0), Celsius(25.0));
            estimator.step(&mut pack, Amps(5.0), Seconds(1.0));
        }
        for state in pack.cell_states() {
            assert_abs_diff_eq!(
                state.state_of_charge,
                0.9 - 2.5 * 300.0 / (3600.0 * 2.5),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn coulomb_count_overwrites_provisional_charge() {
        let mut pack = Pack::builder().build().unwrap();
        let mut estimator = SocEstimator::builder().pack(&pack).build().unwrap();
        pack.states_mut()[1].state_of_charge = 0.1;
        estimator.coulomb_count_step(&mut pack, Amps::ZERO, Seconds(1.0));
        assert_abs_diff_eq!(pack.cells()[1].state().state_of_charge, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn voltage_correction_blends() {
        let mut pack = Pack::builder().build().unwrap();
        let estimator = SocEstimator::builder().pack(&pack).build().unwrap();
        // 3.6 V maps to 0.5:
        pack.states_mut()[0].voltage = Volts(3.6);
        estimator.voltage_correction(&mut pack);
        assert_abs_diff_eq!(
            pack.cells()[0].state().state_of_charge,
            0.98 * 0.9 + 0.02 * 0.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn voltage_correction_clamps_implied_charge() {
        let mut pack = Pack::builder().initial_state_of_charge(1.0).build().unwrap();
        let estimator = SocEstimator::builder().pack(&pack).correction_gain(1.0).build().unwrap();
        pack.states_mut()[0].voltage = Volts(4.5);
        pack.states_mut()[1].voltage = Volts(2.0);
        estimator.voltage_correction(&mut pack);
        assert_eq!(pack.cells()[0].state().state_of_charge, 1.0);
        assert_eq!(pack.cells()[1].state().state_of_charge, 0.0);
    }

    #[test]
    fn ledger_recovers_from_empty() {
        let mut pack = Pack::builder().initial_state_of_charge(0.01).build().unwrap();
        let mut estimator = SocEstimator::builder().pack(&pack).correction_gain(0.0).build().unwrap();

        // Overdraw by 90 C per cell, the state of charge stays at zero:
        estimator.coulomb_count_step(&mut pack, Amps(36.0), Seconds(10.0));
        assert_eq!(pack.cells()[0].state().state_of_charge, 0.0);
        assert_abs_diff_eq!(estimator.remaining_charge()[0].0, -90.0, epsilon = 1e-9);

        // The deficit must be repaid first:
        estimator.coulomb_count_step(&mut pack, Amps(-18.0), Seconds(10.0));
        assert_abs_diff_eq!(pack.cells()[0].state().state_of_charge, 0.0, epsilon = 1e-12);
        estimator.coulomb_count_step(&mut pack, Amps(-18.0), Seconds(10.0));
        assert_abs_diff_eq!(pack.cells()[0].state().state_of_charge, 0.01, epsilon = 1e-12);
    }

    #[test]
    fn rejects_invalid_gain() {
        let pack = Pack::builder().build().unwrap();
        assert!(SocEstimator::builder().pack(&pack).correction_gain(1.5).build().is_err());
        assert!(SocEstimator::builder().pack(&pack).correction_gain(f64::NAN).build().is_err());
    }
}
