mod limits;
mod ocv;
mod pack;
mod simulate;

use clap::{Parser, Subcommand};

pub use self::{
    ocv::{OcvArgs, ocv},
    simulate::{SimulateArgs, simulate},
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the closed-loop pack and controller simulation.
    #[clap(name = "simulate")]
    Simulate(Box<SimulateArgs>),

    /// Print the open-circuit voltage curve.
    #[clap(name = "ocv")]
    Ocv(OcvArgs),
}
