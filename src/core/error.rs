use derive_more::{Display, Error};

use crate::quantity::{AmpHours, JoulesPerKelvin, KelvinsPerWatt, Ohms, Seconds};

/// Invalid model configuration or step input.
///
/// Raised once, at construction or at the first offending step, so that the integration itself
/// never has to guard against producing `NaN` or infinity.
#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum ConfigurationError {
    #[display("cell capacity must be positive and finite, got {capacity}")]
    Capacity { capacity: AmpHours },

    #[display("internal resistance must be non-negative and finite, got {resistance}")]
    InternalResistance { resistance: Ohms },

    #[display("thermal capacitance must be positive and finite, got {capacitance}")]
    ThermalCapacitance { capacitance: JoulesPerKelvin },

    #[display("thermal resistance must be positive and finite, got {resistance}")]
    ThermalResistance { resistance: KelvinsPerWatt },

    #[display("time step must be positive and finite, got {dt}")]
    TimeStep { dt: Seconds },

    #[display("time step {dt} exceeds the thermal time constant {time_constant}")]
    UnstableTimeStep { dt: Seconds, time_constant: Seconds },

    #[display("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[display("state of charge must be within 0..=1, got {soc}")]
    StateOfCharge { soc: f64 },

    #[display("correction gain must be within 0..=1, got {gain}")]
    CorrectionGain { gain: f64 },

    #[display("invalid OCV table: {reason}")]
    OcvTable { reason: &'static str },

    #[display("invalid drive profile: {reason}")]
    DriveProfile { reason: &'static str },

    #[display("invalid BMS limits: {reason}")]
    Limits { reason: &'static str },
}

/// Finite and strictly positive.
pub fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

pub fn is_proportion(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}
