use bon::bon;

use crate::{
    core::{
        bms::{Controller, Limits},
        error::{ConfigurationError, is_positive},
        estimator::{DEFAULT_CORRECTION_GAIN, SocEstimator},
        pack::Pack,
        snapshot::Snapshot,
    },
    prelude::*,
    quantity::{Amps, Celsius, Seconds},
};

/// Single entry point for a control cycle.
///
/// The pack integration, the SOC estimation and the controller read each other's output, so they
/// are only ever run here and always in this order.
#[must_use]
#[derive(Clone, Debug)]
pub struct ControlLoop {
    pack: Pack,
    estimator: SocEstimator,
    controller: Controller,
    time: Seconds,
    n_cycles: u64,
}

#[bon]
impl ControlLoop {
    #[builder]
    pub fn new(
        pack: Pack,
        #[builder(default)] limits: Limits,
        #[builder(default = DEFAULT_CORRECTION_GAIN)] correction_gain: f64,
    ) -> Result<Self> {
        let controller = Controller::new(limits)?;
        let estimator = SocEstimator::builder().pack(&pack).correction_gain(correction_gain).build()?;
        Ok(Self {
            pack,
            estimator,
            controller,
            time: Seconds::ZERO,
            n_cycles: 0,
        })
    }
}

impl ControlLoop {
    /// Run a full control cycle: pack integration, SOC estimation, controller decision.
    ///
    /// Inputs are validated before anything is mutated, so a rejected step leaves the state intact.
    pub fn step(&mut self, current: Amps, dt: Seconds, ambient: Celsius) -> Result<Snapshot> {
        self.validate(current, dt, ambient)?;

        let _ = self.pack.step(current, dt, ambient);
        self.estimator.step(&mut self.pack, current, dt);
        let decision = self.controller.step(&self.pack, current);

        self.time += dt;
        self.n_cycles += 1;
        let snapshot = Snapshot::new(self.time, current, &self.pack, decision);
        trace!(
            n_cycle = self.n_cycles,
            time = ?snapshot.time,
            current = ?current,
            pack_voltage = ?snapshot.pack_voltage,
            average_soc = snapshot.average_soc,
            max_temperature = ?snapshot.max_temperature,
            state = %snapshot.state,
            "cycle",
        );
        Ok(snapshot)
    }

    fn validate(&self, current: Amps, dt: Seconds, ambient: Celsius) -> Result {
        ensure!(is_positive(dt.0), ConfigurationError::TimeStep { dt });
        let time_constant = self.pack.min_time_constant();
        ensure!(dt <= time_constant, ConfigurationError::UnstableTimeStep { dt, time_constant });
        ensure!(current.is_finite(), ConfigurationError::NonFinite { name: "current", value: current.0 });
        ensure!(
            ambient.is_finite(),
            ConfigurationError::NonFinite { name: "ambient temperature", value: ambient.0 },
        );
        let cell_current = Pack::cell_current(current);
        for cell in self.pack.cells() {
            let heat = cell.joule_heating(cell_current);
            ensure!(
                heat.is_finite(),
                ConfigurationError::NonFinite { name: "joule heating", value: heat.0 },
            );
            let temperature = cell.next_temperature(cell_current, dt, ambient);
            ensure!(
                temperature.is_finite(),
                ConfigurationError::NonFinite { name: "cell temperature", value: temperature.0 },
            );
        }
        Ok(())
    }

    pub const fn pack(&self) -> &Pack {
        &self.pack
    }

    /// Direct access to the pack between cycles, for fault injection.
    pub const fn pack_mut(&mut self) -> &mut Pack {
        &mut self.pack
    }

    pub const fn controller(&self) -> &Controller {
        &self.controller
    }

    pub const fn time(&self) -> Seconds {
        self.time
    }

    #[must_use]
    pub const fn n_cycles(&self) -> u64 {
        self.n_cycles
    }
}
