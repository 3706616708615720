use derive_more::Display;
use enumset::{EnumSet, EnumSetType};
use serde::{Serialize, Serializer};

use crate::core::pack::N_CELLS;

/// Per-cell threshold fault, asserted only after persisting for several consecutive cycles.
#[derive(Debug, Display, EnumSetType, Serialize)]
pub enum CellFault {
    #[display("OVERVOLTAGE")]
    #[serde(rename = "OVERVOLTAGE")]
    OverVoltage,

    #[display("UNDERVOLTAGE")]
    #[serde(rename = "UNDERVOLTAGE")]
    UnderVoltage,

    #[display("OVERTEMP")]
    #[serde(rename = "OVERTEMP")]
    OverTemperature,

    #[display("UNDERTEMP")]
    #[serde(rename = "UNDERTEMP")]
    UnderTemperature,
}

impl CellFault {
    pub const ALL: [Self; 4] =
        [Self::OverVoltage, Self::UnderVoltage, Self::OverTemperature, Self::UnderTemperature];
}

/// Pack-level fault, asserted on the very first cycle the condition holds.
#[derive(Debug, Display, EnumSetType, Serialize)]
pub enum PackFault {
    #[display("OVERCURRENT")]
    #[serde(rename = "OVERCURRENT")]
    OverCurrent,
}

/// Consecutive-cycle counters indexed by cell and fault kind.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FaultCounters([[u32; CellFault::ALL.len()]; N_CELLS]);

impl FaultCounters {
    /// Count one more cycle while the condition holds, reset to zero the instant it does not.
    pub const fn update(&mut self, cell: usize, fault: CellFault, condition: bool) -> u32 {
        let counter = &mut self.0[cell][fault as usize];
        *counter = if condition { counter.saturating_add(1) } else { 0 };
        *counter
    }

    #[must_use]
    pub const fn get(&self, cell: usize, fault: CellFault) -> u32 {
        self.0[cell][fault as usize]
    }
}

pub fn serialize_set<T, S>(set: &EnumSet<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: EnumSetType + Serialize,
    S: Serializer,
{
    serializer.collect_seq(set.iter())
}

pub fn serialize_cell_sets<S>(
    sets: &[EnumSet<CellFault>; N_CELLS],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(sets.iter().map(|set| set.iter().collect::<Vec<_>>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_resets_on_single_good_cycle() {
        let mut counters = FaultCounters::default();
        assert_eq!(counters.update(1, CellFault::OverTemperature, true), 1);
        assert_eq!(counters.update(1, CellFault::OverTemperature, true), 2);
        assert_eq!(counters.update(1, CellFault::OverTemperature, false), 0);
        assert_eq!(counters.update(1, CellFault::OverTemperature, true), 1);
    }

    #[test]
    fn counters_are_independent() {
        let mut counters = FaultCounters::default();
        counters.update(0, CellFault::OverVoltage, true);
        counters.update(0, CellFault::OverVoltage, true);
        counters.update(0, CellFault::UnderTemperature, true);
        counters.update(3, CellFault::OverVoltage, true);
        assert_eq!(counters.get(0, CellFault::OverVoltage), 2);
        assert_eq!(counters.get(0, CellFault::UnderTemperature), 1);
        assert_eq!(counters.get(3, CellFault::OverVoltage), 1);
        assert_eq!(counters.get(1, CellFault::OverVoltage), 0);
    }

    #[test]
    fn serializes_as_names() {
        let set = CellFault::OverVoltage | CellFault::UnderTemperature;
        let mut buffer = Vec::new();
        serialize_set(&set, &mut serde_json::Serializer::new(&mut buffer)).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), r#"["OVERVOLTAGE","UNDERTEMP"]"#);
    }

    #[test]
    fn display() {
        assert_eq!(CellFault::OverTemperature.to_string(), "OVERTEMP");
        assert_eq!(PackFault::OverCurrent.to_string(), "OVERCURRENT");
    }
}
