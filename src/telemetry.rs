//! Append-only telemetry log.
//!
//! Every line is a JSON object with a local timestamp, the message ID and the flattened frame.

mod frame;

use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
};

use chrono::{DateTime, Local};
use serde::Serialize;

pub use self::frame::{EventFrame, StatusFrame};
use crate::prelude::*;

/// Telemetry message with a stable field schema.
pub trait Frame: Serialize {
    const MESSAGE_ID: &'static str;
}

#[derive(Serialize)]
struct Envelope<'a, F> {
    timestamp: DateTime<Local>,
    id: &'static str,

    #[serde(flatten)]
    frame: &'a F,
}

pub struct TelemetryLog<W> {
    writer: W,
    n_frames: usize,
}

impl TelemetryLog<BufWriter<File>> {
    /// Open the log file for appending, creating it and its parent directories if needed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("failed to create the telemetry directory")?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context("failed to open the telemetry log")?;
        info!("opened the telemetry log");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TelemetryLog<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer, n_frames: 0 }
    }

    pub fn append<F: Frame>(&mut self, frame: &F) -> Result {
        let envelope = Envelope { timestamp: Local::now(), id: F::MESSAGE_ID, frame };
        serde_json::to_writer(&mut self.writer, &envelope).context("failed to serialize the frame")?;
        self.writer.write_all(b"\n").context("failed to write the frame")?;
        self.n_frames += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result {
        self.writer.flush().context("failed to flush the telemetry log")
    }

    #[must_use]
    pub const fn n_frames(&self) -> usize {
        self.n_frames
    }
}
