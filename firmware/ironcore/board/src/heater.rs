//! Drives the heater PWM from the safety timer.

use crate::HeaterResources;
use defmt::info;
use embassy_stm32::gpio::OutputType;
use embassy_stm32::peripherals;
use embassy_stm32::time::khz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_time::{Duration, Ticker};
use ironcore::PwmSafety;
use ironcore::config::POWER_MODEL;

/// The interval at which the safety timer counts down.
///
/// [`ironcore::pwm::PWM_SAFETY_PERIODS`] of these must exceed one control cycle.
const SAFETY_PERIOD_MS: u64 = 20;

/// The heater PWM safety timer, armed by the control task.
pub static PWM_SAFETY: PwmSafety = PwmSafety::new();

/// The PWM for driving the heating element.
pub struct Heater {
    /// The heater timer.
    pwm: SimplePwm<'static, peripherals::TIM1>,
}

impl Heater {
    /// Set up the heater timer, with the output switched off.
    pub fn new(resources: HeaterResources) -> Self {
        let pin = PwmPin::new(resources.pin_pwm, OutputType::PushPull);
        let mut pwm = SimplePwm::new(
            resources.timer,
            Some(pin),
            None,
            None,
            None,
            khz(1),
            CountingMode::EdgeAlignedUp,
        );

        pwm.ch1().set_duty_cycle_fully_off();
        pwm.ch1().enable();

        Self { pwm }
    }

    /// Apply a duty out of the model's full PWM period.
    fn set_duty(&mut self, duty: u8) {
        let mut channel = self.pwm.ch1();
        let compare =
            channel.max_duty_cycle() as u32 * duty as u32 / POWER_MODEL.total_pwm.max(1) as u32;

        channel.set_duty_cycle(compare as u16);
    }
}

/// Apply the armed heater duty while the safety timer runs.
#[embassy_executor::task]
pub async fn pwm_task(mut heater: Heater) {
    info!("Heater PWM running, dead time {} counts", POWER_MODEL.dead_time());

    let mut ticker = Ticker::every(Duration::from_millis(SAFETY_PERIOD_MS));
    loop {
        heater.set_duty(PWM_SAFETY.on_period_elapsed());
        ticker.next().await;
    }
}
