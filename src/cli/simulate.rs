use std::{num::NonZeroUsize, path::PathBuf};

use clap::Parser;

use crate::{
    cli::{limits::LimitsArgs, pack::PackArgs},
    core::{ControlLoop, Limits, Snapshot},
    prelude::*,
    profile::{ConstantCurrent, CurrentSource, DriveProfile},
    quantity::{Amps, Celsius, Seconds},
    simulation::Simulation,
    tables::{build_cells_table, build_summary_table, build_trajectory_table},
    telemetry::{EventFrame, StatusFrame, TelemetryLog},
};

#[derive(Parser)]
pub struct SimulateArgs {
    /// Simulated duration.
    #[clap(long, default_value = "10min", env = "SIMULATION_DURATION")]
    pub duration: humantime::Duration,

    /// Control cycle period in seconds, must not exceed the cell thermal time constant.
    #[clap(long = "time-step-seconds", default_value = "1", env = "TIME_STEP_SECONDS")]
    pub time_step: Seconds,

    /// Ambient temperature in degrees Celsius.
    #[clap(long = "ambient-temperature", default_value = "25", env = "AMBIENT_TEMPERATURE")]
    pub ambient: Celsius,

    /// Drive profile TOML file with `[[segment]]` entries.
    #[clap(long = "profile-path", env = "PROFILE_PATH", conflicts_with = "constant_current")]
    pub profile_path: Option<PathBuf>,

    /// Constant pack current in amperes instead of a drive profile, positive for discharge.
    #[clap(long = "constant-current", env = "CONSTANT_CURRENT")]
    pub constant_current: Option<Amps>,

    /// Weight of the voltage-implied state of charge in the estimator correction.
    #[clap(long = "soc-correction-gain", default_value = "0.02", env = "SOC_CORRECTION_GAIN")]
    pub correction_gain: f64,

    /// Append telemetry frames to this JSON-lines file.
    #[clap(long = "telemetry-path", env = "TELEMETRY_PATH")]
    pub telemetry_path: Option<PathBuf>,

    /// Write a status frame every this many steps.
    #[clap(long = "telemetry-interval", default_value = "5", env = "TELEMETRY_INTERVAL")]
    pub telemetry_interval: NonZeroUsize,

    /// Print a trajectory row every this many steps.
    #[clap(long = "report-interval", default_value = "30", env = "REPORT_INTERVAL")]
    pub report_interval: NonZeroUsize,

    #[clap(flatten)]
    pub pack: PackArgs,

    #[clap(flatten)]
    pub limits: LimitsArgs,
}

#[instrument(skip_all)]
pub fn simulate(args: &SimulateArgs) -> Result {
    let simulation = Simulation::builder()
        .duration(Seconds::from(std::time::Duration::from(args.duration)))
        .time_step(args.time_step)
        .ambient(args.ambient)
        .build()?;
    let mut control_loop = ControlLoop::builder()
        .pack(args.pack.build_pack()?)
        .limits(Limits::try_from(args.limits)?)
        .correction_gain(args.correction_gain)
        .build()?;

    let trajectory = if let Some(current) = args.constant_current {
        run(args, &simulation, &mut control_loop, &ConstantCurrent(current))?
    } else if let Some(path) = &args.profile_path {
        run(args, &simulation, &mut control_loop, &DriveProfile::from_path(path)?)?
    } else {
        run(args, &simulation, &mut control_loop, &DriveProfile::default())?
    };

    info!(
        n_cycles = control_loop.n_cycles(),
        time = %control_loop.time(),
        state = %control_loop.controller().state(),
        "simulated",
    );

    println!("{}", build_trajectory_table(&trajectory, args.report_interval.get()));
    println!("{}", build_summary_table(&trajectory));
    if let Some(last) = trajectory.last() {
        println!("{}", build_cells_table(last));
    }
    Ok(())
}

fn run(
    args: &SimulateArgs,
    simulation: &Simulation,
    control_loop: &mut ControlLoop,
    source: &impl CurrentSource,
) -> Result<Vec<Snapshot>> {
    let mut telemetry = args.telemetry_path.as_ref().map(TelemetryLog::open).transpose()?;
    let mut previous: Option<Snapshot> = None;

    let trajectory = simulation.run(control_loop, source, |step, snapshot| {
        if let Some(telemetry) = &mut telemetry {
            if step % args.telemetry_interval.get() == 0 {
                telemetry.append(&StatusFrame::from(snapshot))?;
            }
            if previous.as_ref().is_none_or(|previous| snapshot.is_event_since(previous)) {
                telemetry.append(&EventFrame::from(snapshot))?;
            }
        }
        previous = Some(snapshot.clone());
        Ok(())
    })?;

    if let Some(mut telemetry) = telemetry {
        telemetry.flush()?;
        info!(n_frames = telemetry.n_frames(), "written the telemetry");
    }
    Ok(trajectory)
}
