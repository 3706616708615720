quantity!(Volts, suffix: "V", precision: 3);
quantity!(Amps, suffix: "A", precision: 2);
quantity!(Ohms, suffix: "Ω", precision: 3);
quantity!(Watts, suffix: "W", precision: 3);

product!(Amps, Ohms, Volts);
product!(Volts, Amps, Watts);
