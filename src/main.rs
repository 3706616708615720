#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod cli;
mod core;
mod prelude;
mod profile;
mod quantity;
mod simulation;
mod tables;
mod telemetry;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command, ocv, simulate},
    prelude::*,
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Simulate(args) => simulate(&args),
        Command::Ocv(args) => ocv(&args),
    }
}
