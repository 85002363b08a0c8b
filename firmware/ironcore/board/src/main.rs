//! Soldering controller firmware for the STM32G431 board.
#![no_std]
#![no_main]

mod board;
mod control;
mod heater;
mod sensors;

use assign_resources::assign_resources;
use defmt::info;
use embassy_executor::Spawner;
use embassy_stm32::{Config, Peri, peripherals};
use {defmt_rtt as _, panic_probe as _};

assign_resources! {
    #[allow(missing_docs)]
    sensors: SensorResources {
        adc: ADC1,
        pin_handle: PA0,
        pin_tip: PA1,
        pin_voltage: PA2,
        pin_sense: PA3,
        dma: DMA1_CH1,
    }
    #[allow(missing_docs)]
    heater: HeaterResources {
        timer: TIM1,
        pin_pwm: PA8,
    }
    #[allow(missing_docs)]
    sense: SenseResources {
        pin_pullup: PB4,
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        config.rcc.hsi = true;
        config.rcc.hse = None;
        config.rcc.pll = Some(Pll {
            source: PllSource::HSI,
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL85,
            divp: Some(PllPDiv::DIV20), // 17 MHz ADC clock
            divq: None,
            divr: Some(PllRDiv::DIV2), // 170 MHz system clock
        });
        config.rcc.mux.adc12sel = mux::Adcsel::PLL1_P;
        config.rcc.sys = Sysclk::PLL1_R;
        config.enable_debug_during_sleep = true;
    }
    let p = embassy_stm32::init(config);
    let r = split_resources!(p);

    info!("ironcore {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"));

    spawner.must_spawn(sensors::adc_task(sensors::Sensors::new(r.sensors)));
    spawner.must_spawn(heater::pwm_task(heater::Heater::new(r.heater)));
    spawner.must_spawn(control::control_task(board::IronBoard::new(r.sense)));
}
