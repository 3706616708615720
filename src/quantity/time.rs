use std::time::Duration;

quantity!(Seconds, suffix: "s", precision: 1);

impl From<Duration> for Seconds {
    fn from(duration: Duration) -> Self {
        Self(duration.as_secs_f64())
    }
}
