//! The heater control loop.

use crate::board::IronBoard;
use defmt::{info, warn};
use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Ticker};
use ironcore::config::{CONTROL_HZ, POWER_MODEL, Settings};
use ironcore::{SenseConfig, SensingContext, TipThermoModel};

/// Raw thermocouple counts per °C of the tip amplifier.
const RAW_PER_DEGREE: u8 = 4;

/// The tip presence polling period.
const PRESENCE_POLL_MS: u64 = 10;

/// The tip set point in °C.
const SET_POINT_C: u32 = 320;

/// The thermocouple on the tip, behind a linear amplifier.
struct TipThermocouple;

impl TipThermoModel for TipThermocouple {
    fn tip_max_c(&self) -> u32 {
        450
    }

    fn tip_c(&self, raw: u16) -> u32 {
        raw as u32 / RAW_PER_DEGREE as u32
    }
}

/// Log a change of tip presence.
fn report_presence(context: &SensingContext<IronBoard>, disconnected: bool) {
    if disconnected {
        warn!("Tip removed");
    } else {
        info!(
            "Tip detected, resistance {} x0.1 Ohm",
            context.presence().resistance_x10()
        );
    }
}

/// Run the sensing core at the control rate, and drive the heater towards the set point.
///
/// Tip presence is polled more often than the control rate, so that sensing phases end close to
/// their settle time.
#[embassy_executor::task]
pub async fn control_task(board: IronBoard) {
    let settings = Settings::default();
    let mut context = SensingContext::new(board, POWER_MODEL, settings, SenseConfig::default());
    let thermo = TipThermocouple;

    let set_point_c = SET_POINT_C.min(thermo.tip_max_c());
    let mut was_disconnected = true;

    info!("Set point {} degC", set_point_c);

    let mut control_ticker = Ticker::every(Duration::from_hz(CONTROL_HZ as u64));
    let mut presence_ticker = Ticker::every(Duration::from_millis(PRESENCE_POLL_MS));
    loop {
        let control_cycle = matches!(
            select(control_ticker.next(), presence_ticker.next()).await,
            Either::First(_)
        );

        let raw = context.update_raw_temperature(control_cycle);
        let disconnected = context.is_tip_disconnected(&thermo);

        if disconnected != was_disconnected {
            report_presence(&context, disconnected);
            was_disconnected = disconnected;

            if disconnected {
                context.set_tip_milliwatts(0);
            }
        }

        if !control_cycle {
            continue;
        }

        let milliwatts = if disconnected {
            0
        } else {
            let target_raw = (set_point_c * RAW_PER_DEGREE as u32) as i32;
            context.temp_to_milliwatts(target_raw - raw as i32, RAW_PER_DEGREE)
        };

        context.set_tip_milliwatts(milliwatts);
    }
}
