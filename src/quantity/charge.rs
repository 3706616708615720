use crate::quantity::{electric::Amps, time::Seconds};

quantity!(AmpHours, suffix: "Ah", precision: 3);
quantity!(Coulombs, suffix: "C", precision: 1);

product!(Amps, Seconds, Coulombs);

impl From<AmpHours> for Coulombs {
    fn from(amp_hours: AmpHours) -> Self {
        Self(amp_hours.0 * 3600.0)
    }
}

impl From<Coulombs> for AmpHours {
    fn from(coulombs: Coulombs) -> Self {
        Self(coulombs.0 / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amp_hours_to_coulombs() {
        assert_eq!(Coulombs::from(AmpHours(2.5)), Coulombs(9000.0));
        assert_eq!(AmpHours::from(Coulombs(9000.0)), AmpHours(2.5));
    }

    #[test]
    fn charge_flow() {
        assert_eq!(Amps(2.5) * Seconds(2.0), Coulombs(5.0));
    }
}
