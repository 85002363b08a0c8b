//! Conversion between heating power and heater PWM duty.
//!
//! The heater is modelled as a plain resistor. A fixed part of every PWM period
//! (the dead time) is reserved for ADC sampling and delivers no power.
//!
//! All values are integer fixed-point. Intermediate results are truncated on purpose.

#[cfg(feature = "defmt")]
use defmt::Format;

/// Below this demand, the heater is not driven at all.
pub const MIN_DRIVE_MILLIWATTS: i32 = 10;

/// Heater and PWM constants of a hardware variant.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub struct PowerModel {
    /// The tip's thermal mass in mJ/°C.
    pub tip_thermal_mass: u16,
    /// The heater resistance in 0.1 Ω.
    pub tip_resistance_x10: u16,
    /// The highest duty count that drives the heater.
    pub power_pwm: u8,
    /// The full PWM period in counts, including the ADC dead time.
    pub total_pwm: u16,
}

impl PowerModel {
    /// TS100 soldering iron.
    pub const TS100: Self = Self {
        tip_thermal_mass: 2020,
        tip_resistance_x10: 85,
        power_pwm: 255,
        total_pwm: 255 + 30,
    };

    /// TS80 soldering iron.
    pub const TS80: Self = Self {
        tip_thermal_mass: 1000 / 4,
        tip_resistance_x10: 46,
        power_pwm: 255,
        total_pwm: 255 + 30,
    };

    /// MHP30 hot plate. Samples without a dead time.
    pub const MHP30: Self = Self {
        tip_thermal_mass: 65,
        tip_resistance_x10: 60,
        power_pwm: 255,
        total_pwm: 255,
    };

    /// The part of the PWM period that delivers no power.
    pub const fn dead_time(&self) -> u16 {
        self.total_pwm.saturating_sub(self.power_pwm as u16)
    }

    /// The power available at full drive, for a supply voltage in 0.1 V.
    ///
    /// `P = V² / R`, scaled down by `power_pwm / total_pwm` because full duty cannot be reached.
    /// With V in 0.1 V and R in 0.1 Ω, the result is in 0.1 W.
    pub fn available_power_x10(&self, voltage_x10: u16) -> u32 {
        let voltage_x10 = voltage_x10 as u64;
        let full_power = voltage_x10 * voltage_x10 / self.tip_resistance_x10.max(1) as u64;

        (full_power * self.power_pwm as u64 / self.total_pwm.max(1) as u64) as u32
    }

    /// The duty needed for delivering `milliwatts`, given the available power at full drive.
    ///
    /// Demands below [`MIN_DRIVE_MILLIWATTS`] and an unpowered supply yield zero duty.
    /// The result is clamped to `0..=power_pwm`.
    pub fn power_to_pwm(&self, milliwatts: i32, available_power_x10: u32) -> u8 {
        if milliwatts < MIN_DRIVE_MILLIWATTS || available_power_x10 == 0 {
            return 0;
        }

        let duty = self.power_pwm as i64 * milliwatts as i64 / available_power_x10 as i64;
        duty.clamp(0, self.power_pwm as i64) as u8
    }

    /// The power delivered at `duty`, given the available power at full drive.
    pub fn pwm_to_power(&self, duty: u8, available_power_x10: u32) -> u32 {
        if self.power_pwm == 0 {
            return 0;
        }

        (duty as u64 * available_power_x10 as u64 / self.power_pwm as u64) as u32
    }

    /// The power needed to change the tip temperature by `raw_delta` within one control cycle.
    ///
    /// `raw_per_degree` is the raw reading change per °C. The division happens before scaling with
    /// the thermal mass.
    pub fn temp_to_milliwatts(&self, raw_delta: i32, raw_per_degree: u8) -> i32 {
        if raw_per_degree == 0 {
            return 0;
        }

        self.tip_thermal_mass as i32 * (raw_delta / raw_per_degree as i32)
    }
}
