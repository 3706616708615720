//! Battery management controller: fault detection, balancing and cooling decisions.

use bon::bon;
use comfy_table::Color;
use derive_more::Display;
use enumset::EnumSet;
use serde::Serialize;

use crate::{
    core::{
        error::ConfigurationError,
        fault::{CellFault, FaultCounters, PackFault},
        pack::{N_CELLS, Pack},
    },
    prelude::*,
    quantity::{Amps, Celsius, Volts},
};

/// Overall safety mode, recomputed from scratch on every cycle.
#[derive(Copy, Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyState {
    #[display("NORMAL")]
    Normal,

    #[display("FAULT")]
    Fault,

    #[display("SHUTDOWN")]
    Shutdown,
}

impl SafetyState {
    pub const ALL: [Self; 3] = [Self::Normal, Self::Fault, Self::Shutdown];

    pub const fn color(self) -> Color {
        match self {
            Self::Normal => Color::Green,
            Self::Fault => Color::DarkYellow,
            Self::Shutdown => Color::Red,
        }
    }
}

/// Three-tier thermal ladder, the most severe tier wins.
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cooling {
    #[display("COOLING_OFF")]
    CoolingOff,

    #[display("COOLING_ON")]
    CoolingOn,

    #[display("EMERGENCY_SHUTDOWN")]
    EmergencyShutdown,
}

impl Cooling {
    pub const fn color(self) -> Color {
        match self {
            Self::CoolingOff => Color::Reset,
            Self::CoolingOn => Color::Cyan,
            Self::EmergencyShutdown => Color::Red,
        }
    }
}

/// Advisory passive balancing action.
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalancingAction {
    #[display("IDLE")]
    Idle,

    #[display("BLEED")]
    Bleed,
}

/// Thresholds the controller compares against, all comparisons are strict.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Limits {
    pub max_cell_voltage: Volts,
    pub min_cell_voltage: Volts,
    pub max_cell_temperature: Celsius,
    pub min_cell_temperature: Celsius,

    /// Absolute pack current limit, applied in both directions.
    pub max_pack_current: Amps,

    /// Number of consecutive cycles for a cell fault to be asserted.
    pub persistence: u32,

    /// State-of-charge excess over the mean at which a cell gets bled.
    pub balance_threshold: f64,

    pub cooling_temperature: Celsius,
    pub emergency_temperature: Celsius,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_cell_voltage: Volts(4.25),
            min_cell_voltage: Volts(2.7),
            max_cell_temperature: Celsius(60.0),
            min_cell_temperature: Celsius(0.0),
            max_pack_current: Amps(10.0),
            persistence: 3,
            balance_threshold: 0.02,
            cooling_temperature: Celsius(45.0),
            emergency_temperature: Celsius(60.0),
        }
    }
}

#[bon]
impl Limits {
    #[builder]
    pub fn new(
        #[builder(default = Volts(4.25))] max_cell_voltage: Volts,
        #[builder(default = Volts(2.7))] min_cell_voltage: Volts,
        #[builder(default = Celsius(60.0))] max_cell_temperature: Celsius,
        #[builder(default = Celsius(0.0))] min_cell_temperature: Celsius,
        #[builder(default = Amps(10.0))] max_pack_current: Amps,
        #[builder(default = 3)] persistence: u32,
        #[builder(default = 0.02)] balance_threshold: f64,
        #[builder(default = Celsius(45.0))] cooling_temperature: Celsius,
        #[builder(default = Celsius(60.0))] emergency_temperature: Celsius,
    ) -> Result<Self> {
        let limits = Self {
            max_cell_voltage,
            min_cell_voltage,
            max_cell_temperature,
            min_cell_temperature,
            max_pack_current,
            persistence,
            balance_threshold,
            cooling_temperature,
            emergency_temperature,
        };
        limits.validate()?;
        Ok(limits)
    }
}

impl Limits {
    pub fn validate(&self) -> Result {
        let invalid = |reason| ConfigurationError::Limits { reason };
        ensure!(
            self.max_cell_voltage.is_finite() && self.min_cell_voltage.is_finite(),
            invalid("voltage thresholds must be finite"),
        );
        ensure!(
            self.min_cell_voltage < self.max_cell_voltage,
            invalid("undervoltage threshold must be below the overvoltage one"),
        );
        ensure!(
            self.max_cell_temperature.is_finite()
                && self.min_cell_temperature.is_finite()
                && self.cooling_temperature.is_finite()
                && self.emergency_temperature.is_finite(),
            invalid("temperature thresholds must be finite"),
        );
        ensure!(
            self.min_cell_temperature < self.max_cell_temperature,
            invalid("undertemperature threshold must be below the overtemperature one"),
        );
        ensure!(
            self.cooling_temperature <= self.emergency_temperature,
            invalid("cooling threshold must not exceed the emergency one"),
        );
        ensure!(
            self.max_pack_current.is_finite() && self.max_pack_current > Amps::ZERO,
            invalid("pack current limit must be positive and finite"),
        );
        ensure!(self.persistence != 0, invalid("persistence must be at least one cycle"));
        ensure!(
            self.balance_threshold.is_finite() && self.balance_threshold >= 0.0,
            invalid("balance threshold must be non-negative and finite"),
        );
        Ok(())
    }
}

/// Controller output for a single cycle.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub state: SafetyState,
    pub cell_faults: [EnumSet<CellFault>; N_CELLS],
    pub pack_faults: EnumSet<PackFault>,
    pub balancing: [BalancingAction; N_CELLS],
    pub cooling: Cooling,
}

impl Decision {
    #[must_use]
    pub fn has_faults(&self) -> bool {
        !self.pack_faults.is_empty() || self.cell_faults.iter().any(|faults| !faults.is_empty())
    }
}

#[must_use]
#[derive(Clone, Debug)]
pub struct Controller {
    limits: Limits,
    counters: FaultCounters,

    /// Last resolved state, kept only to report transitions.
    state: SafetyState,
}

impl Controller {
    pub fn new(limits: Limits) -> Result<Self> {
        limits.validate()?;
        Ok(Self { limits, counters: FaultCounters::default(), state: SafetyState::Normal })
    }

    /// Run one control cycle against the post-correction pack state.
    pub fn step(&mut self, pack: &Pack, pack_current: Amps) -> Decision {
        let cell_faults = self.check_cell_faults(pack);
        let pack_faults = self.check_pack_faults(pack_current);
        let balancing = self.balancing_actions(pack);
        let cooling = self.cooling_decision(pack);

        let mut decision =
            Decision { state: SafetyState::Normal, cell_faults, pack_faults, balancing, cooling };
        decision.state = if cooling == Cooling::EmergencyShutdown {
            SafetyState::Shutdown
        } else if decision.has_faults() {
            SafetyState::Fault
        } else {
            SafetyState::Normal
        };
        self.transition_to(decision.state);
        decision
    }

    /// Update the persistence counters and return the asserted faults per cell.
    pub fn check_cell_faults(&mut self, pack: &Pack) -> [EnumSet<CellFault>; N_CELLS] {
        let mut faults = [EnumSet::empty(); N_CELLS];
        for (index, cell) in pack.cell_states().iter().enumerate() {
            for fault in CellFault::ALL {
                let condition = match fault {
                    CellFault::OverVoltage => cell.voltage > self.limits.max_cell_voltage,
                    CellFault::UnderVoltage => cell.voltage < self.limits.min_cell_voltage,
                    CellFault::OverTemperature => cell.temperature > self.limits.max_cell_temperature,
                    CellFault::UnderTemperature => {
                        cell.temperature < self.limits.min_cell_temperature
                    }
                };
                let count = self.counters.update(index, fault, condition);
                if count == self.limits.persistence {
                    warn!(cell = index, %fault, "fault asserted");
                }
                if count >= self.limits.persistence {
                    faults[index].insert(fault);
                }
            }
        }
        faults
    }

    /// Pack faults have no persistence filter.
    pub fn check_pack_faults(&self, pack_current: Amps) -> EnumSet<PackFault> {
        if pack_current.abs() > self.limits.max_pack_current {
            EnumSet::only(PackFault::OverCurrent)
        } else {
            EnumSet::empty()
        }
    }

    #[expect(clippy::cast_precision_loss)]
    pub fn balancing_actions(&self, pack: &Pack) -> [BalancingAction; N_CELLS] {
        let cells = pack.cell_states();
        let mean = cells.iter().map(|cell| cell.state_of_charge).sum::<f64>() / N_CELLS as f64;
        cells.map(|cell| {
            if cell.state_of_charge - mean > self.limits.balance_threshold {
                BalancingAction::Bleed
            } else {
                BalancingAction::Idle
            }
        })
    }

    pub fn cooling_decision(&self, pack: &Pack) -> Cooling {
        let max_temperature = pack.max_temperature();
        if max_temperature > self.limits.emergency_temperature {
            Cooling::EmergencyShutdown
        } else if max_temperature > self.limits.cooling_temperature {
            Cooling::CoolingOn
        } else {
            Cooling::CoolingOff
        }
    }

    fn transition_to(&mut self, state: SafetyState) {
        if state == self.state {
            return;
        }
        match state {
            SafetyState::Normal => info!(from = %self.state, to = %state, "safety state changed"),
            SafetyState::Fault | SafetyState::Shutdown => {
                warn!(from = %self.state, to = %state, "safety state changed");
            }
        }
        self.state = state;
    }

    pub const fn counters(&self) -> &FaultCounters {
        &self.counters
    }

    #[must_use]
    pub const fn state(&self) -> SafetyState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack() -> Pack {
        Pack::builder().build().unwrap()
    }

    #[test]
    fn normal_on_fresh_pack() {
        let mut controller = Controller::new(Limits::default()).unwrap();
        let decision = controller.step(&pack(), Amps(5.0));
        assert_eq!(decision.state, SafetyState::Normal);
        assert!(!decision.has_faults());
        assert_eq!(decision.cooling, Cooling::CoolingOff);
        assert_eq!(decision.balancing, [BalancingAction::Idle; N_CELLS]);
    }

    #[test]
    fn persistence_minus_one_never_asserts() {
        let mut controller = Controller::new(Limits::default()).unwrap();
        let mut pack = pack();
        for _ in 0..10 {
            pack.states_mut()[2].voltage = Volts(4.3);
            for _ in 0..2 {
                let decision = controller.step(&pack, Amps::ZERO);
                assert!(decision.cell_faults[2].is_empty());
                assert_eq!(decision.state, SafetyState::Normal);
            }
            pack.states_mut()[2].voltage = Volts(4.0);
            let decision = controller.step(&pack, Amps::ZERO);
            assert!(decision.cell_faults[2].is_empty());
            assert_eq!(controller.counters().get(2, CellFault::OverVoltage), 0);
        }
    }

    #[test]
    fn persistence_asserts_on_the_last_cycle() {
        let mut controller = Controller::new(Limits::default()).unwrap();
        let mut pack = pack();
        pack.states_mut()[1].voltage = Volts(2.5);
        assert!(controller.step(&pack, Amps::ZERO).cell_faults[1].is_empty());
        assert!(controller.step(&pack, Amps::ZERO).cell_faults[1].is_empty());
        let decision = controller.step(&pack, Amps::ZERO);
        assert_eq!(decision.cell_faults[1], EnumSet::only(CellFault::UnderVoltage));
        assert_eq!(decision.state, SafetyState::Fault);
        for index in [0, 2, 3] {
            assert!(decision.cell_faults[index].is_empty());
        }

        // Still asserted while the condition holds:
        assert_eq!(controller.step(&pack, Amps::ZERO).state, SafetyState::Fault);

        // Cleared by a single good cycle:
        pack.states_mut()[1].voltage = Volts(3.7);
        let decision = controller.step(&pack, Amps::ZERO);
        assert!(decision.cell_faults[1].is_empty());
        assert_eq!(decision.state, SafetyState::Normal);
    }

    #[test]
    fn thresholds_are_strict() {
        let mut controller = Controller::new(Limits::default()).unwrap();
        let mut pack = pack();
        pack.states_mut()[0].voltage = Volts(4.25);
        pack.states_mut()[1].voltage = Volts(2.7);
        pack.states_mut()[2].temperature = Celsius(0.0);
        for _ in 0..5 {
            assert!(!controller.step(&pack, Amps(10.0)).has_faults());
        }
    }

    #[test]
    fn undertemperature() {
        let mut controller = Controller::new(Limits::default()).unwrap();
        let mut pack = pack();
        pack.states_mut()[3].temperature = Celsius(-5.0);
        let decisions: Vec<_> = (0..3).map(|_| controller.step(&pack, Amps::ZERO)).collect();
        assert_eq!(decisions[2].cell_faults[3], EnumSet::only(CellFault::UnderTemperature));
        assert_eq!(decisions[2].cooling, Cooling::CoolingOff);
    }

    #[test]
    fn overcurrent_without_persistence() {
        let mut controller = Controller::new(Limits::default()).unwrap();
        let pack = pack();
        for _ in 0..3 {
            let decision = controller.step(&pack, Amps(12.0));
            assert_eq!(decision.pack_faults, EnumSet::only(PackFault::OverCurrent));
            assert_eq!(decision.state, SafetyState::Fault);
        }
        assert_eq!(
            controller.step(&pack, Amps(-12.0)).pack_faults,
            EnumSet::only(PackFault::OverCurrent)
        );
        assert_eq!(controller.step(&pack, Amps(3.0)).state, SafetyState::Normal);
    }

    #[test]
    fn emergency_overrides_faults() {
        let mut controller = Controller::new(Limits::default()).unwrap();
        let mut pack = pack();
        pack.states_mut()[0].temperature = Celsius(61.0);
        let decision = controller.step(&pack, Amps(12.0));
        assert_eq!(decision.cooling, Cooling::EmergencyShutdown);
        assert_eq!(decision.state, SafetyState::Shutdown);
        assert!(decision.pack_faults.contains(PackFault::OverCurrent));
        // Overtemperature is not yet persistent:
        assert!(decision.cell_faults[0].is_empty());
    }

    #[test]
    fn shutdown_does_not_latch() {
        let mut controller = Controller::new(Limits::default()).unwrap();
        let mut pack = pack();
        pack.states_mut()[0].temperature = Celsius(65.0);
        assert_eq!(controller.step(&pack, Amps::ZERO).state, SafetyState::Shutdown);
        assert_eq!(controller.state(), SafetyState::Shutdown);
        pack.states_mut()[0].temperature = Celsius(30.0);
        assert_eq!(controller.step(&pack, Amps::ZERO).state, SafetyState::Normal);
        assert_eq!(controller.state(), SafetyState::Normal);
    }

    #[test]
    fn cooling_ladder() {
        let controller = Controller::new(Limits::default()).unwrap();
        let mut pack = pack();
        assert_eq!(controller.cooling_decision(&pack), Cooling::CoolingOff);
        pack.states_mut()[1].temperature = Celsius(45.0);
        assert_eq!(controller.cooling_decision(&pack), Cooling::CoolingOff);
        pack.states_mut()[1].temperature = Celsius(45.5);
        assert_eq!(controller.cooling_decision(&pack), Cooling::CoolingOn);
        pack.states_mut()[3].temperature = Celsius(60.0);
        assert_eq!(controller.cooling_decision(&pack), Cooling::CoolingOn);
        pack.states_mut()[3].temperature = Celsius(60.1);
        assert_eq!(controller.cooling_decision(&pack), Cooling::EmergencyShutdown);
    }

    #[test]
    fn bleeds_high_cells() {
        let controller = Controller::new(Limits::default()).unwrap();
        let mut pack = pack();
        pack.states_mut()[0].state_of_charge = 0.95;
        pack.states_mut()[1].state_of_charge = 0.85;
        pack.states_mut()[2].state_of_charge = 0.9;
        pack.states_mut()[3].state_of_charge = 0.9;
        assert_eq!(
            controller.balancing_actions(&pack),
            [
                BalancingAction::Bleed,
                BalancingAction::Idle,
                BalancingAction::Idle,
                BalancingAction::Idle,
            ]
        );
    }

    #[test]
    fn limits_builder() {
        assert_eq!(Limits::builder().build().unwrap(), Limits::default());
        assert!(Limits::builder().persistence(0).build().is_err());
        assert!(Limits::builder().max_pack_current(Amps(-1.0)).build().is_err());
        assert!(Limits::builder().min_cell_voltage(Volts(5.0)).build().is_err());
        assert!(Limits::builder().cooling_temperature(Celsius(70.0)).build().is_err());
    }

    #[test]
    fn new_rejects_invalid_limits() {
        let limits = Limits { persistence: 0, ..Limits::default() };
        let error = Controller::new(limits).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::Limits { .. })
        ));
    }

    #[test]
    fn custom_persistence() {
        let limits = Limits::builder().persistence(1).build().unwrap();
        let mut controller = Controller::new(limits).unwrap();
        let mut pack = pack();
        pack.states_mut()[0].temperature = Celsius(55.0);
        pack.states_mut()[0].voltage = Volts(4.3);
        let decision = controller.step(&pack, Amps::ZERO);
        assert_eq!(decision.cell_faults[0], EnumSet::only(CellFault::OverVoltage));
        assert_eq!(decision.cooling, Cooling::CoolingOn);
        assert_eq!(decision.state, SafetyState::Fault);
    }
}
