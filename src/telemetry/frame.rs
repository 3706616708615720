use enumset::EnumSet;
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    core::{
        CellFault,
        Cooling,
        N_CELLS,
        PackFault,
        SafetyState,
        Snapshot,
        fault::{serialize_cell_sets, serialize_set},
    },
    telemetry::Frame,
};

/// Periodic status message, rounded for transmission.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusFrame {
    pub pack_voltage: f64,
    pub avg_soc: f64,
    pub max_temp: f64,

    #[serde(flatten)]
    pub cells: CellFields,
}

impl Frame for StatusFrame {
    const MESSAGE_ID: &'static str = "0x100";
}

impl From<&Snapshot> for StatusFrame {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            pack_voltage: round(snapshot.pack_voltage.0, 3),
            avg_soc: round(snapshot.average_soc, 3),
            max_temp: round(snapshot.max_temperature.0, 2),
            cells: CellFields {
                voltages: snapshot.cell_voltages.map(|voltage| round(voltage.0, 3)),
                socs: snapshot.cell_socs.map(|soc| round(soc, 3)),
                temperatures: snapshot.cell_temperatures.map(|temperature| round(temperature.0, 2)),
            },
        }
    }
}

/// Per-cell fields serialized flat as `v{i}`, `soc{i}` and `t{i}`.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct CellFields {
    pub voltages: [f64; N_CELLS],
    pub socs: [f64; N_CELLS],
    pub temperatures: [f64; N_CELLS],
}

impl Serialize for CellFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3 * N_CELLS))?;
        for index in 0..N_CELLS {
            map.serialize_entry(&format!("v{index}"), &self.voltages[index])?;
            map.serialize_entry(&format!("soc{index}"), &self.socs[index])?;
            map.serialize_entry(&format!("t{index}"), &self.temperatures[index])?;
        }
        map.end()
    }
}

/// Controller output, logged whenever the state, cooling or faults change.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventFrame {
    pub time: f64,
    pub state: SafetyState,
    pub cooling: Cooling,

    #[serde(serialize_with = "serialize_cell_sets")]
    pub cell_faults: [EnumSet<CellFault>; N_CELLS],

    #[serde(serialize_with = "serialize_set")]
    pub pack_faults: EnumSet<PackFault>,
}

impl Frame for EventFrame {
    const MESSAGE_ID: &'static str = "0x101";
}

impl From<&Snapshot> for EventFrame {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            time: snapshot.time.0,
            state: snapshot.state,
            cooling: snapshot.cooling,
            cell_faults: snapshot.cell_faults,
            pack_faults: snapshot.pack_faults,
        }
    }
}

fn round(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}
