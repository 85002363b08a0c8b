//! Periodic ADC sampling of all channels that the sensing core reads.

use core::cell::Cell;

use crate::SensorResources;
use defmt::trace;
use embassy_stm32::adc::{self, AdcChannel as _};
use embassy_stm32::{Peri, peripherals};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_time::{Duration, Ticker};
use ironcore::{AdcChannel, scale_adc_code};

/// The ADC resolution.
const ADC_RESOLUTION: adc::Resolution = adc::Resolution::BITS12;
/// The ADC resolution in bits, matching [`ADC_RESOLUTION`].
const ADC_RESOLUTION_BITS: u32 = 12;

/// ADC sample time for the thermal channels in cycles.
const ADC_SAMPLE_TIME_TEMP: adc::SampleTime = adc::SampleTime::CYCLES92_5;
/// ADC sample time for supply voltage and tip sense in cycles.
const ADC_SAMPLE_TIME_SENSE: adc::SampleTime = adc::SampleTime::CYCLES640_5;

/// The sampling period of all channels.
const ADC_PERIOD_MS: u64 = 10;

/// The latest conversion of every channel, scaled to the core's ADC resolution.
#[derive(Clone, Copy, Default)]
pub struct AdcReadings {
    /// Handle NTC.
    handle: u16,
    /// Tip thermocouple.
    tip: u16,
    /// Supply voltage divider.
    voltage: u16,
    /// Tip sense line.
    sense: u16,
}

impl AdcReadings {
    /// The latest conversion of `channel`.
    pub fn get(&self, channel: AdcChannel) -> u16 {
        match channel {
            AdcChannel::HandleTemperature => self.handle,
            AdcChannel::TipTemperature => self.tip,
            AdcChannel::SupplyVoltage => self.voltage,
            AdcChannel::TipSense => self.sense,
        }
    }
}

/// The latest readings, published by the ADC task.
///
/// Zero until the first conversion completed.
pub static ADC_READINGS: Mutex<ThreadModeRawMutex, Cell<AdcReadings>> =
    Mutex::new(Cell::new(AdcReadings {
        handle: 0,
        tip: 0,
        voltage: 0,
        sense: 0,
    }));

/// Sensors, resources for measurements.
pub struct Sensors {
    /// The ADC.
    adc: adc::Adc<'static, peripherals::ADC1>,
    /// The handle NTC input.
    pin_handle: adc::AnyAdcChannel<peripherals::ADC1>,
    /// The tip thermocouple amplifier input.
    pin_tip: adc::AnyAdcChannel<peripherals::ADC1>,
    /// The supply voltage divider input.
    pin_voltage: adc::AnyAdcChannel<peripherals::ADC1>,
    /// The tip sense input.
    pin_sense: adc::AnyAdcChannel<peripherals::ADC1>,
    /// The DMA for the ADC.
    adc_dma: Peri<'static, peripherals::DMA1_CH1>,
}

impl Sensors {
    /// Set up the ADC and its inputs.
    pub fn new(resources: SensorResources) -> Self {
        let mut adc = adc::Adc::new(resources.adc);
        adc.set_resolution(ADC_RESOLUTION);

        Self {
            adc,
            pin_handle: resources.pin_handle.degrade_adc(),
            pin_tip: resources.pin_tip.degrade_adc(),
            pin_voltage: resources.pin_voltage.degrade_adc(),
            pin_sense: resources.pin_sense.degrade_adc(),
            adc_dma: resources.dma,
        }
    }

    /// Convert all channels in one sequence.
    async fn measure(&mut self) -> AdcReadings {
        let mut adc_buffer = [0u16; 4];

        self.adc
            .read(
                self.adc_dma.reborrow(),
                [
                    (&mut self.pin_handle, ADC_SAMPLE_TIME_TEMP),
                    (&mut self.pin_tip, ADC_SAMPLE_TIME_TEMP),
                    (&mut self.pin_voltage, ADC_SAMPLE_TIME_SENSE),
                    (&mut self.pin_sense, ADC_SAMPLE_TIME_SENSE),
                ]
                .into_iter(),
                &mut adc_buffer,
            )
            .await;

        trace!("ADC values: {}", adc_buffer);

        let [handle, tip, voltage, sense] =
            adc_buffer.map(|code| scale_adc_code(code, ADC_RESOLUTION_BITS));

        AdcReadings {
            handle,
            tip,
            voltage,
            sense,
        }
    }
}

/// Sample all channels periodically, and publish the readings.
#[embassy_executor::task]
pub async fn adc_task(mut sensors: Sensors) {
    let mut ticker = Ticker::every(Duration::from_millis(ADC_PERIOD_MS));

    loop {
        let readings = sensors.measure().await;
        ADC_READINGS.lock(|x| x.set(readings));

        ticker.next().await;
    }
}
