//! Open-circuit voltage curve.
//!
//! The curve is a piecewise-linear table so that a measured cell characteristic can be swapped
//! in without touching the integration. The default table is the two-point linear approximation
//! between 3.0 V at empty and 4.2 V at full, which is not a fidelity target.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    core::error::{ConfigurationError, is_proportion},
    prelude::*,
    quantity::Volts,
};

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OcvPoint {
    pub soc: f64,
    pub voltage: Volts,
}

#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct OcvTable {
    points: Vec<OcvPoint>,
}

#[derive(Deserialize)]
struct OcvTableFile {
    #[serde(rename = "point")]
    points: Vec<OcvPoint>,
}

impl Default for OcvTable {
    fn default() -> Self {
        Self {
            points: vec![
                OcvPoint { soc: 0.0, voltage: Volts(3.0) },
                OcvPoint { soc: 1.0, voltage: Volts(4.2) },
            ],
        }
    }
}

impl OcvTable {
    /// Build a table from points sorted by state of charge.
    ///
    /// Both coordinates must be strictly increasing so that the curve is invertible.
    pub fn try_new(points: Vec<OcvPoint>) -> Result<Self> {
        ensure!(points.len() >= 2, ConfigurationError::OcvTable { reason: "at least two points required" });
        for point in &points {
            ensure!(
                point.soc.is_finite() && point.voltage.is_finite(),
                ConfigurationError::OcvTable { reason: "points must be finite" },
            );
            ensure!(
                is_proportion(point.soc),
                ConfigurationError::OcvTable { reason: "state of charge must be within 0..=1" },
            );
        }
        for (lower, upper) in points.iter().zip(&points[1..]) {
            ensure!(
                upper.soc > lower.soc,
                ConfigurationError::OcvTable { reason: "state of charge must be strictly increasing" },
            );
            ensure!(
                upper.voltage > lower.voltage,
                ConfigurationError::OcvTable { reason: "voltage must be strictly increasing" },
            );
        }
        Ok(Self { points })
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("failed to read the OCV table")?;
        let file: OcvTableFile = toml::from_str(&contents).context("failed to parse the OCV table")?;
        let table = Self::try_new(file.points)?;
        info!(n_points = table.points.len(), "loaded the OCV table");
        Ok(table)
    }

    pub fn points(&self) -> &[OcvPoint] {
        &self.points
    }

    /// Open-circuit voltage at the state of charge, flat beyond the table ends.
    pub fn voltage_at(&self, soc: f64) -> Volts {
        let (lower, upper) = self.segment(self.points.partition_point(|point| point.soc <= soc));
        let t = ((soc - lower.soc) / (upper.soc - lower.soc)).clamp(0.0, 1.0);
        lower.voltage + (upper.voltage - lower.voltage) * t
    }

    /// Inverse of [`OcvTable::voltage_at`], clamped to `0..=1`.
    #[must_use]
    pub fn state_of_charge_at(&self, voltage: Volts) -> f64 {
        let (lower, upper) =
            self.segment(self.points.partition_point(|point| point.voltage <= voltage));
        let t = ((voltage - lower.voltage) / (upper.voltage - lower.voltage)).clamp(0.0, 1.0);
        (lower.soc + (upper.soc - lower.soc) * t).clamp(0.0, 1.0)
    }

    /// Sample the curve on an evenly spaced state-of-charge grid.
    #[expect(clippy::cast_precision_loss)]
    pub fn sample(&self, n_steps: usize) -> impl Iterator<Item = OcvPoint> + '_ {
        let n_steps = n_steps.max(1);
        (0..=n_steps).map(move |i| {
            let soc = i as f64 / n_steps as f64;
            OcvPoint { soc, voltage: self.voltage_at(soc) }
        })
    }

    fn segment(&self, index: usize) -> (OcvPoint, OcvPoint) {
        let index = index.clamp(1, self.points.len() - 1);
        (self.points[index - 1], self.points[index])
    }
}
