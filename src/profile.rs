//! Drive-cycle current sources.

use std::{fs, path::Path};

use serde::Deserialize;

use crate::{
    core::ConfigurationError,
    prelude::*,
    quantity::{Amps, Seconds},
};

/// Anything that supplies the pack current, positive for discharge, at a simulated time.
pub trait CurrentSource {
    fn current_at(&self, time: Seconds) -> Amps;
}

impl<F: Fn(Seconds) -> Amps> CurrentSource for F {
    fn current_at(&self, time: Seconds) -> Amps {
        self(time)
    }
}

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct ConstantCurrent(pub Amps);

impl CurrentSource for ConstantCurrent {
    fn current_at(&self, _time: Seconds) -> Amps {
        self.0
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct Segment {
    /// Exclusive end of the segment.
    pub until: Seconds,

    pub current: Amps,
}

/// Piecewise-constant current profile, zero after the last segment.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct DriveProfile {
    segments: Vec<Segment>,
}

#[derive(Deserialize)]
struct DriveProfileFile {
    #[serde(rename = "segment")]
    segments: Vec<Segment>,
}

impl Default for DriveProfile {
    /// Idle, moderate discharge, then an overcurrent burst followed by rest.
    fn default() -> Self {
        Self {
            segments: vec![
                Segment { until: Seconds(100.0), current: Amps::ZERO },
                Segment { until: Seconds(400.0), current: Amps(5.0) },
                Segment { until: Seconds(500.0), current: Amps(12.0) },
            ],
        }
    }
}

impl DriveProfile {
    pub fn try_new(segments: Vec<Segment>) -> Result<Self> {
        for segment in &segments {
            ensure!(
                segment.until.is_finite() && segment.current.is_finite(),
                ConfigurationError::DriveProfile { reason: "segments must be finite" },
            );
        }
        ensure!(
            segments.iter().zip(segments.iter().skip(1)).all(|(lower, upper)| lower.until < upper.until),
            ConfigurationError::DriveProfile { reason: "segment ends must be strictly increasing" },
        );
        Ok(Self { segments })
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("failed to read the drive profile")?;
        let file: DriveProfileFile =
            toml::from_str(&contents).context("failed to parse the drive profile")?;
        let profile = Self::try_new(file.segments)?;
        info!(n_segments = profile.segments.len(), "loaded the drive profile");
        Ok(profile)
    }
}

impl CurrentSource for DriveProfile {
    fn current_at(&self, time: Seconds) -> Amps {
        self.segments
            .iter()
            .find(|segment| time < segment.until)
            .map_or(Amps::ZERO, |segment| segment.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile() {
        let profile = DriveProfile::default();
        assert_eq!(profile.current_at(Seconds(0.0)), Amps::ZERO);
        assert_eq!(profile.current_at(Seconds(99.0)), Amps::ZERO);
        assert_eq!(profile.current_at(Seconds(100.0)), Amps(5.0));
        assert_eq!(profile.current_at(Seconds(399.0)), Amps(5.0));
        assert_eq!(profile.current_at(Seconds(400.0)), Amps(12.0));
        assert_eq!(profile.current_at(Seconds(500.0)), Amps::ZERO);
        assert_eq!(profile.current_at(Seconds(1e6)), Amps::ZERO);
    }

    #[test]
    fn closure_source() {
        let source = |time: Seconds| Amps(time.0 / 10.0);
        assert_eq!(source.current_at(Seconds(20.0)), Amps(2.0));
        assert_eq!(ConstantCurrent(Amps(3.0)).current_at(Seconds(1.0)), Amps(3.0));
    }

    #[test]
    fn parses_toml() {
        let file: DriveProfileFile = toml::from_str(
            r"
            [[segment]]
            until = 10.0
            current = 1.5

            [[segment]]
            until = 20.0
            current = -2.0
            ",
        )
        .unwrap();
        let profile = DriveProfile::try_new(file.segments).unwrap();
        assert_eq!(profile.current_at(Seconds(5.0)), Amps(1.5));
        assert_eq!(profile.current_at(Seconds(15.0)), Amps(-2.0));
        assert_eq!(profile.current_at(Seconds(25.0)), Amps::ZERO);
    }

    #[test]
    fn rejects_unordered_segments() {
        let error = DriveProfile::try_new(vec![
            Segment { until: Seconds(20.0), current: Amps(1.0) },
            Segment { until: Seconds(10.0), current: Amps(2.0) },
        ])
        .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::DriveProfile { .. })
        ));
    }
}
