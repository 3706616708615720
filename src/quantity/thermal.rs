use crate::quantity::{electric::Watts, time::Seconds};

quantity!(Celsius, suffix: "°C", precision: 2);
quantity!(Joules, suffix: "J", precision: 3);

// Lumped thermal capacitance, J/°C.
quantity!(JoulesPerKelvin, suffix: "J/K", precision: 1);

// Thermal resistance to ambient, °C/W.
quantity!(KelvinsPerWatt, suffix: "K/W", precision: 3);

product!(Watts, Seconds, Joules);
product!(KelvinsPerWatt, JoulesPerKelvin, Seconds);
quotient!(Joules, JoulesPerKelvin, Celsius);
quotient!(Celsius, KelvinsPerWatt, Watts);

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn time_constant() {
        assert_abs_diff_eq!((KelvinsPerWatt(0.5) * JoulesPerKelvin(200.0)).0, 100.0, epsilon = 1e-12);
    }

    #[test]
    fn heating() {
        let energy = Watts(2.0) * Seconds(100.0);
        assert_abs_diff_eq!((energy / JoulesPerKelvin(200.0)).0, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn convective_loss() {
        assert_abs_diff_eq!((Celsius(10.0) / KelvinsPerWatt(0.5)).0, 20.0, epsilon = 1e-12);
    }
}
