pub mod bms;
pub mod cell;
pub mod control_loop;
pub mod error;
pub mod estimator;
pub mod fault;
pub mod ocv;
pub mod pack;
pub mod snapshot;

pub use self::{
    bms::{BalancingAction, Controller, Cooling, Decision, Limits, SafetyState},
    cell::{Cell, CellParameters, CellState},
    control_loop::ControlLoop,
    error::ConfigurationError,
    estimator::SocEstimator,
    fault::{CellFault, PackFault},
    ocv::{OcvPoint, OcvTable},
    pack::{N_CELLS, Pack},
    snapshot::Snapshot,
};
