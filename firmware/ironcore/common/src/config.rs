//! Build-time constants and user settings.

use crate::power::PowerModel;
#[cfg(feature = "defmt")]
use defmt::Format;
use serde::{Deserialize, Serialize};

/// The control loop rate in Hz.
pub const CONTROL_HZ: usize = 8;

/// Depth of the raw tip temperature filter (one second of samples).
pub const TEMPERATURE_FILTER_DEPTH: usize = CONTROL_HZ;

/// Depth of the delivered power history (one oscillation period of the control loop).
pub const POWER_HISTORY_DEPTH: usize = 4 * CONTROL_HZ;

/// Depth of the supply voltage filter.
pub const VOLTAGE_FILTER_DEPTH: usize = 32;

/// The number of first voltage reads that refill the whole voltage filter.
pub const VOLTAGE_PREFILL_CALLS: u8 = 10;

/// The heater model of the selected hardware variant.
#[cfg(feature = "model-ts100")]
pub const POWER_MODEL: PowerModel = PowerModel::TS100;

/// The heater model of the selected hardware variant.
#[cfg(all(feature = "model-ts80", not(feature = "model-ts100")))]
pub const POWER_MODEL: PowerModel = PowerModel::TS80;

/// The heater model of the selected hardware variant.
#[cfg(not(any(feature = "model-ts100", feature = "model-ts80")))]
pub const POWER_MODEL: PowerModel = PowerModel::MHP30;

/// User settings that affect sensing and power delivery.
///
/// Persisted by the settings storage, outside of this crate.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub struct Settings {
    /// Calibration divisor of the supply voltage reading.
    pub voltage_div: u16,
}

impl Settings {
    /// Default settings.
    pub const fn default() -> Self {
        Self { voltage_div: 467 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_survive_storage_encoding() {
        let settings = Settings { voltage_div: 512 };

        let mut buffer = [0u8; 8];
        let encoded = postcard::to_slice(&settings, &mut buffer).unwrap();
        let decoded: Settings = postcard::from_bytes(encoded).unwrap();

        assert_eq!(decoded, settings);
    }

    #[test]
    fn model_fits_pwm_period() {
        assert!(POWER_MODEL.power_pwm as u16 <= POWER_MODEL.total_pwm);
    }
}
