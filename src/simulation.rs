//! Fixed-step closed-loop simulation.

use bon::bon;

use crate::{
    core::{ConfigurationError, ControlLoop, Snapshot},
    prelude::*,
    profile::CurrentSource,
    quantity::{Celsius, Seconds},
};

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Simulation {
    duration: Seconds,
    time_step: Seconds,
    ambient: Celsius,
}

#[bon]
impl Simulation {
    #[builder]
    pub fn new(
        duration: Seconds,
        time_step: Seconds,
        #[builder(default = Celsius(25.0))] ambient: Celsius,
    ) -> Result<Self> {
        ensure!(
            time_step.is_finite() && time_step > Seconds::ZERO,
            ConfigurationError::TimeStep { dt: time_step },
        );
        ensure!(
            duration.is_finite() && duration >= Seconds::ZERO,
            ConfigurationError::NonFinite { name: "duration", value: duration.0 },
        );
        ensure!(
            ambient.is_finite(),
            ConfigurationError::NonFinite { name: "ambient", value: ambient.0 },
        );
        Ok(Self { duration, time_step, ambient })
    }
}

impl Simulation {
    /// Number of whole time steps that fit in the duration.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn n_steps(&self) -> usize {
        (self.duration / self.time_step).floor() as usize
    }

    /// Drive the control loop through every step, calling `on_step` after each cycle.
    ///
    /// The current is sampled at the start of the step.
    #[instrument(skip_all, fields(duration = %self.duration, time_step = %self.time_step))]
    pub fn run(
        &self,
        control_loop: &mut ControlLoop,
        source: &impl CurrentSource,
        mut on_step: impl FnMut(usize, &Snapshot) -> Result,
    ) -> Result<Vec<Snapshot>> {
        let n_steps = self.n_steps();
        info!(n_steps, "simulating…");

        let mut trajectory = Vec::new();
        for step in 0..n_steps {
            #[expect(clippy::cast_precision_loss)]
            let time = self.time_step * step as f64;
            let snapshot = control_loop
                .step(source.current_at(time), self.time_step, self.ambient)
                .with_context(|| format!("control cycle #{step} failed"))?;
            on_step(step, &snapshot)?;
            trajectory.push(snapshot);
        }

        if let Some(last) = trajectory.last() {
            info!(
                pack_voltage = %last.pack_voltage,
                average_soc = last.average_soc,
                max_temperature = %last.max_temperature,
                state = %last.state,
                "finished",
            );
        }
        Ok(trajectory)
    }
}
