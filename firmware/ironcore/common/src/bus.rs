//! I2C bus recovery.
//!
//! If the controller resets in the middle of a read, a target may keep holding SDA low while it
//! waits for the clock to continue. Clocking SCL by hand until the target releases SDA frees the
//! bus, after which the I2C peripheral is reset and handed back to its driver.
//!
//! The sequence and its timing live here. Register access is behind [`BusRecovery`].

use embedded_hal::delay::DelayNs;

/// The maximum number of clock pulses before giving up.
pub const MAX_CLOCK_PULSES: u8 = 100;

/// Half of a recovery clock period, in µs (100 kHz).
const HALF_PERIOD_US: u32 = 5;

/// Time to hold the peripheral software reset, in ns.
const RESET_PULSE_NS: u32 = 100;

/// Errors during bus recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// SDA was still held low after [`MAX_CLOCK_PULSES`] pulses. The peripheral stays disabled.
    StillHung,
}

/// An I2C bus line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// The clock line.
    Scl,
    /// The data line.
    Sda,
}

/// The owner of a bus line. Both modes are open-drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineMode {
    /// Driven by software, as a general purpose output.
    Gpio,
    /// Driven by the I2C peripheral (alternate function).
    Peripheral,
}

/// Register-level primitives of an I2C peripheral and its pins.
pub trait BusRecovery {
    /// Enable or disable the peripheral.
    fn set_enabled(&mut self, enabled: bool);

    /// Hand a line to software or to the peripheral.
    fn set_line_mode(&mut self, line: Line, mode: LineMode);

    /// Release (high) or pull down (low) a line.
    fn write_line(&mut self, line: Line, high: bool);

    /// Read the level of a line.
    fn read_line(&mut self, line: Line) -> bool;

    /// Assert or clear the peripheral's software reset.
    fn set_software_reset(&mut self, asserted: bool);

    /// Reinitialize the peripheral through its driver.
    fn reinit(&mut self);
}

/// Free a bus whose SDA line is held low, and reinitialize the peripheral.
///
/// Gives up after [`MAX_CLOCK_PULSES`] clock pulses. The caller should probe the bus again
/// afterwards in any case.
pub fn recover(bus: &mut impl BusRecovery, delay: &mut impl DelayNs) -> Result<(), Error> {
    bus.set_enabled(false);

    for line in [Line::Scl, Line::Sda] {
        bus.set_line_mode(line, LineMode::Gpio);
        bus.write_line(line, true);
    }

    let mut pulses = 0;
    while !bus.read_line(Line::Sda) {
        if pulses == MAX_CLOCK_PULSES {
            warn!("I2C bus still hung after {} clock pulses", pulses);
            return Err(Error::StillHung);
        }

        bus.write_line(Line::Scl, false);
        delay.delay_us(HALF_PERIOD_US);
        bus.write_line(Line::Scl, true);
        delay.delay_us(HALF_PERIOD_US);

        pulses += 1;
    }

    for line in [Line::Scl, Line::Sda] {
        bus.set_line_mode(line, LineMode::Peripheral);
        bus.write_line(line, true);
    }

    bus.set_software_reset(true);
    delay.delay_ns(RESET_PULSE_NS);
    bus.set_software_reset(false);
    delay.delay_ns(RESET_PULSE_NS);

    bus.set_enabled(true);
    bus.reinit();

    debug!("I2C bus recovered after {} clock pulses", pulses);
    Ok(())
}
