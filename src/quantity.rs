#[macro_use]
mod macros;

pub mod charge;
pub mod electric;
pub mod thermal;
pub mod time;

pub use self::{
    charge::{AmpHours, Coulombs},
    electric::{Amps, Ohms, Volts, Watts},
    thermal::{Celsius, Joules, JoulesPerKelvin, KelvinsPerWatt},
    time::Seconds,
};
