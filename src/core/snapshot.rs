use enumset::EnumSet;

use crate::{
    core::{
        bms::{BalancingAction, Cooling, Decision, SafetyState},
        fault::{CellFault, PackFault},
        pack::{N_CELLS, Pack},
    },
    quantity::{Amps, Celsius, Seconds, Volts},
};

/// Complete state after a control cycle, unrounded.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Simulated time at the end of the cycle.
    pub time: Seconds,

    /// Pack current applied during the cycle.
    pub current: Amps,

    pub cell_voltages: [Volts; N_CELLS],
    pub cell_socs: [f64; N_CELLS],
    pub cell_temperatures: [Celsius; N_CELLS],
    pub pack_voltage: Volts,
    pub average_soc: f64,
    pub max_temperature: Celsius,
    pub state: SafetyState,
    pub cell_faults: [EnumSet<CellFault>; N_CELLS],
    pub pack_faults: EnumSet<PackFault>,
    pub balancing: [BalancingAction; N_CELLS],
    pub cooling: Cooling,
}

impl Snapshot {
    pub fn new(time: Seconds, current: Amps, pack: &Pack, decision: Decision) -> Self {
        let cells = pack.cell_states();
        Self {
            time,
            current,
            cell_voltages: cells.map(|cell| cell.voltage),
            cell_socs: cells.map(|cell| cell.state_of_charge),
            cell_temperatures: cells.map(|cell| cell.temperature),
            pack_voltage: pack.voltage(),
            average_soc: pack.average_state_of_charge(),
            max_temperature: pack.max_temperature(),
            state: decision.state,
            cell_faults: decision.cell_faults,
            pack_faults: decision.pack_faults,
            balancing: decision.balancing,
            cooling: decision.cooling,
        }
    }

    /// Whether the reported faults, state or cooling differ from the other snapshot.
    #[must_use]
    pub fn is_event_since(&self, previous: &Self) -> bool {
        self.state != previous.state
            || self.cooling != previous.cooling
            || self.cell_faults != previous.cell_faults
            || self.pack_faults != previous.pack_faults
    }

    /// All asserted faults, cell ones prefixed with the cell index.
    pub fn fault_labels(&self) -> impl Iterator<Item = String> + '_ {
        self.cell_faults
            .iter()
            .enumerate()
            .flat_map(|(index, faults)| faults.iter().map(move |fault| format!("{fault}#{index}")))
            .chain(self.pack_faults.iter().map(|fault| fault.to_string()))
    }
}
