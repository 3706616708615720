use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::Itertools;

use crate::core::{BalancingAction, OcvTable, SafetyState, Snapshot};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

/// Every `interval`-th snapshot, plus the last one.
pub fn build_trajectory_table(trajectory: &[Snapshot], interval: usize) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Time", "Current", "Pack", "SoC", "Max temp", "State", "Cooling", "Faults",
    ]);
    let last_index = trajectory.len().saturating_sub(1);
    for (index, snapshot) in trajectory.iter().enumerate() {
        if index % interval.max(1) != 0 && index != last_index {
            continue;
        }
        let faults = snapshot.fault_labels().join(", ");
        table.add_row(vec![
            Cell::new(snapshot.time).set_alignment(CellAlignment::Right),
            Cell::new(snapshot.current).set_alignment(CellAlignment::Right).fg(
                if snapshot.pack_faults.is_empty() { Color::Reset } else { Color::Red },
            ),
            Cell::new(snapshot.pack_voltage).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", snapshot.average_soc * 100.0))
                .set_alignment(CellAlignment::Right),
            Cell::new(snapshot.max_temperature).set_alignment(CellAlignment::Right),
            Cell::new(snapshot.state).fg(snapshot.state.color()),
            Cell::new(snapshot.cooling).fg(snapshot.cooling.color()),
            Cell::new(faults).add_attribute(Attribute::Dim),
        ]);
    }
    table
}

/// Number of cycles spent in each safety state.
pub fn build_summary_table(trajectory: &[Snapshot]) -> Table {
    let counts = trajectory.iter().map(|snapshot| snapshot.state).counts();

    let mut table = new_table();
    table.set_header(vec!["State", "Cycles", "Share"]);
    for state in SafetyState::ALL {
        let n_cycles = counts.get(&state).copied().unwrap_or_default();
        #[expect(clippy::cast_precision_loss)]
        let share = if trajectory.is_empty() {
            0.0
        } else {
            n_cycles as f64 / trajectory.len() as f64
        };
        table.add_row(vec![
            Cell::new(state).fg(state.color()),
            Cell::new(n_cycles).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", share * 100.0))
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

pub fn build_cells_table(snapshot: &Snapshot) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Cell", "Voltage", "SoC", "Temperature", "Balancing", "Faults"]);
    for index in 0..snapshot.cell_voltages.len() {
        let faults = &snapshot.cell_faults[index];
        let balancing = snapshot.balancing[index];
        table.add_row(vec![
            Cell::new(index).add_attribute(Attribute::Dim),
            Cell::new(snapshot.cell_voltages[index]).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", snapshot.cell_socs[index] * 100.0))
                .set_alignment(CellAlignment::Right),
            Cell::new(snapshot.cell_temperatures[index]).set_alignment(CellAlignment::Right),
            Cell::new(balancing).fg(match balancing {
                BalancingAction::Idle => Color::Reset,
                BalancingAction::Bleed => Color::DarkYellow,
            }),
            Cell::new(faults.iter().join(", ")).fg(if faults.is_empty() {
                Color::Green
            } else {
                Color::Red
            }),
        ]);
    }
    table
}

pub fn build_ocv_table(ocv: &OcvTable, n_steps: usize) -> Table {
    let mut table = new_table();
    table.set_header(vec!["SoC", "Voltage", "Inverse"]);
    for point in ocv.sample(n_steps) {
        table.add_row(vec![
            Cell::new(format!("{:.1}%", point.soc * 100.0)).set_alignment(CellAlignment::Right),
            Cell::new(point.voltage).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", ocv.state_of_charge_at(point.voltage) * 100.0))
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{ControlLoop, Pack},
        quantity::{Amps, Celsius, Seconds},
    };

    fn trajectory(n_steps: usize) -> Vec<Snapshot> {
        let mut control_loop =
            ControlLoop::builder().pack(Pack::builder().build().unwrap()).build().unwrap();
        (0..n_steps)
            .map(|step| {
                let current = if step < 5 { Amps(2.0) } else { Amps(12.0) };
                control_loop.step(current, Seconds(1.0), Celsius(25.0)).unwrap()
            })
            .collect()
    }

    #[test]
    fn trajectory_table_samples_rows() {
        let table = build_trajectory_table(&trajectory(10), 4);
        // Steps 0, 4, 8 and the last one.
        assert_eq!(table.row_count(), 4);
    }

    #[test]
    fn summary_counts_states() {
        let rendered = build_summary_table(&trajectory(8)).to_string();
        assert!(rendered.contains("NORMAL"));
        assert!(rendered.contains("62.5%"));
        assert!(rendered.contains("37.5%"));
    }

    #[test]
    fn cells_table_has_row_per_cell() {
        let trajectory = trajectory(6);
        let table = build_cells_table(trajectory.last().unwrap());
        assert_eq!(table.row_count(), 4);
    }

    #[test]
    fn ocv_table() {
        let table = build_ocv_table(&OcvTable::default(), 10);
        assert_eq!(table.row_count(), 11);
    }
}
