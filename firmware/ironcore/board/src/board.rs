//! The sensing core's view of this board.

use crate::SenseResources;
use crate::heater::PWM_SAFETY;
use crate::sensors::ADC_READINGS;
use embassy_stm32::gpio::{Flex, Speed};
use embassy_time::Instant;
use ironcore::{AdcChannel, Board};

/// Hardware access for the sensing core.
pub struct IronBoard {
    /// The tip sense pull-up. Push-pull high when engaged, analog (high impedance) otherwise.
    sense_pullup: Flex<'static>,
}

impl IronBoard {
    /// Create the board with a released sense pull-up.
    pub fn new(resources: SenseResources) -> Self {
        let mut sense_pullup = Flex::new(resources.pin_pullup);
        sense_pullup.set_as_analog();

        Self { sense_pullup }
    }
}

impl Board for IronBoard {
    fn read_adc(&mut self, channel: AdcChannel) -> u16 {
        ADC_READINGS.lock(|x| x.get().get(channel))
    }

    fn set_tip_pwm(&mut self, duty: u8) {
        PWM_SAFETY.arm(duty);
    }

    fn set_sense_pullup(&mut self, engaged: bool) {
        if engaged {
            self.sense_pullup.set_high();
            self.sense_pullup.set_as_output(Speed::Low);
        } else {
            self.sense_pullup.set_low();
            self.sense_pullup.set_as_analog();
        }
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}
