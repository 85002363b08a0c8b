//! Hardware access required by the sensing core.
//!
//! The core never touches registers. A board implementation provides raw ADC
//! codes, the heater PWM output, the tip-sense pull-up and a monotonic clock.

use embassy_time::Instant;

/// The resolution in bits of the ADC codes that the core expects from [`Board::read_adc`].
///
/// Voltage calibration, the sense full scale and the handle NTC table are all based on it.
pub const ADC_RESOLUTION_BITS: u32 = 15;

/// Scale a code of an ADC with `resolution_bits` to [`ADC_RESOLUTION_BITS`].
///
/// Saturates at `u16::MAX` for codes beyond the stated resolution.
pub const fn scale_adc_code(code: u16, resolution_bits: u32) -> u16 {
    let scaled = if resolution_bits <= ADC_RESOLUTION_BITS {
        (code as u32) << (ADC_RESOLUTION_BITS - resolution_bits)
    } else {
        match (code as u32).checked_shr(resolution_bits - ADC_RESOLUTION_BITS) {
            Some(scaled) => scaled,
            None => 0,
        }
    };

    if scaled > u16::MAX as u32 {
        u16::MAX
    } else {
        scaled as u16
    }
}

/// ADC inputs that the core samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcChannel {
    /// The handle NTC thermistor.
    HandleTemperature,
    /// The tip thermocouple amplifier.
    TipTemperature,
    /// The supply voltage divider.
    SupplyVoltage,
    /// The tip identification resistor sense line.
    TipSense,
}

/// Board-level primitives used by [`crate::SensingContext`].
pub trait Board {
    /// Take one conversion on `channel`, scaled to [`ADC_RESOLUTION_BITS`].
    ///
    /// Acquisition failures are not reported. Implementations return a stale or zero code instead.
    fn read_adc(&mut self, channel: AdcChannel) -> u16;

    /// Write the heater PWM duty (out of the model's full PWM period).
    fn set_tip_pwm(&mut self, duty: u8);

    /// Engage (drive high) or release (high impedance) the tip-sense pull-up.
    fn set_sense_pullup(&mut self, engaged: bool);

    /// The current time of the monotonic tick source.
    fn now(&self) -> Instant;
}

/// Conversion of raw tip readings to temperature.
pub trait TipThermoModel {
    /// The highest temperature in °C that the tip model can represent.
    fn tip_max_c(&self) -> u32;

    /// The tip temperature in °C for a (filtered) raw tip reading.
    fn tip_c(&self, raw: u16) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_bit_codes_are_shifted_up() {
        assert_eq!(scale_adc_code(0, 12), 0);
        assert_eq!(scale_adc_code(2919, 12), 23352);
        assert_eq!(scale_adc_code(4095, 12), 32760);
    }

    #[test]
    fn native_and_wider_codes() {
        assert_eq!(scale_adc_code(23350, ADC_RESOLUTION_BITS), 23350);
        assert_eq!(scale_adc_code(46700, 16), 23350);
        assert_eq!(scale_adc_code(u16::MAX, 12), u16::MAX);
    }
}
