//! Per-device sensing and power delivery state, driven by the control task.

use crate::board::{AdcChannel, Board, TipThermoModel};
use crate::config::{
    POWER_HISTORY_DEPTH, Settings, TEMPERATURE_FILTER_DEPTH, VOLTAGE_FILTER_DEPTH,
    VOLTAGE_PREFILL_CALLS,
};
use crate::handle;
use crate::history::FilteredHistory;
use crate::power::PowerModel;
use crate::presence::{SenseConfig, TipPresence};
use crate::voltage::VoltageSampler;

/// Filters, sampler and tip detection of one device, together with its board.
///
/// All of this is touched from the control task only.
pub struct SensingContext<B: Board> {
    /// Hardware access.
    board: B,
    /// Heater and PWM constants.
    model: PowerModel,
    /// User settings.
    settings: Settings,
    /// Smoothed raw tip temperature.
    temperature: FilteredHistory<u16, TEMPERATURE_FILTER_DEPTH>,
    /// Smoothed power that was actually delivered.
    power: FilteredHistory<u32, POWER_HISTORY_DEPTH>,
    /// Supply voltage readings.
    voltage: VoltageSampler<VOLTAGE_FILTER_DEPTH>,
    /// Tip presence detection.
    presence: TipPresence,
}

impl<B: Board> SensingContext<B> {
    /// Create a new context for `board`.
    pub fn new(board: B, model: PowerModel, settings: Settings, sense: SenseConfig) -> Self {
        Self {
            board,
            model,
            settings,
            temperature: FilteredHistory::new(),
            power: FilteredHistory::new(),
            voltage: VoltageSampler::new(VOLTAGE_PREFILL_CALLS),
            presence: TipPresence::new(sense),
        }
    }

    /// The board.
    pub fn board(&self) -> &B {
        &self.board
    }

    /// The board, mutably.
    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    /// The heater model in use.
    pub fn model(&self) -> &PowerModel {
        &self.model
    }

    /// Replace the user settings.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// One unfiltered tip temperature reading.
    pub fn tip_instant_raw(&mut self) -> u16 {
        self.board.read_adc(AdcChannel::TipTemperature)
    }

    /// The filtered raw tip temperature.
    ///
    /// If `refresh` is set, a new reading enters the filter first.
    pub fn update_raw_temperature(&mut self, refresh: bool) -> u16 {
        if refresh {
            let sample = self.tip_instant_raw();
            self.temperature.update(sample);
        }

        self.temperature.average()
    }

    /// The handle temperature in 0.1 °C.
    pub fn handle_temperature_x10(&mut self) -> i32 {
        handle::handle_temperature_x10(self.board.read_adc(AdcChannel::HandleTemperature))
    }

    /// The supply voltage in 0.1 V.
    ///
    /// See [`VoltageSampler::read_x10`].
    pub fn read_supply_voltage_x10(&mut self, divisor: u16, resample: bool) -> u16 {
        let board = &mut self.board;
        self.voltage
            .read_x10(divisor, resample, || board.read_adc(AdcChannel::SupplyVoltage))
    }

    /// The power at full drive in 0.1 W, at the current supply voltage.
    pub fn available_power_x10(&mut self, divisor: u16, resample: bool) -> u32 {
        let voltage_x10 = self.read_supply_voltage_x10(divisor, resample);
        self.model.available_power_x10(voltage_x10)
    }

    /// The duty for delivering `milliwatts` at the current supply voltage.
    pub fn power_to_pwm(&mut self, milliwatts: i32, divisor: u16, resample: bool) -> u8 {
        let available_power_x10 = self.available_power_x10(divisor, resample);
        self.model.power_to_pwm(milliwatts, available_power_x10)
    }

    /// The power delivered at `duty` at the current supply voltage.
    pub fn pwm_to_power(&mut self, duty: u8, divisor: u16, resample: bool) -> u32 {
        let available_power_x10 = self.available_power_x10(divisor, resample);
        self.model.pwm_to_power(duty, available_power_x10)
    }

    /// See [`PowerModel::temp_to_milliwatts`].
    pub fn temp_to_milliwatts(&self, raw_delta: i32, raw_per_degree: u8) -> i32 {
        self.model.temp_to_milliwatts(raw_delta, raw_per_degree)
    }

    /// Drive the heater with `milliwatts`.
    ///
    /// Takes a fresh voltage sample, writes the duty and records the power that this duty
    /// actually delivers.
    pub fn set_tip_milliwatts(&mut self, milliwatts: i32) {
        let divisor = self.settings.voltage_div;

        let duty = self.power_to_pwm(milliwatts, divisor, true);
        self.board.set_tip_pwm(duty);

        let delivered = self.pwm_to_power(duty, divisor, false);
        self.power.update(delivered);
    }

    /// The smoothed power that was delivered recently.
    pub fn average_power(&self) -> u32 {
        self.power.average()
    }

    /// If true, the tip must be treated as disconnected.
    ///
    /// Also true while the tip's identification resistor is being measured.
    pub fn is_tip_disconnected(&mut self, thermo: &impl TipThermoModel) -> bool {
        let now = self.board.now();
        let tip_c = thermo.tip_c(self.temperature.average());

        self.presence
            .poll(now, tip_c, thermo.tip_max_c(), &mut self.board)
    }

    /// The tip detection state machine.
    pub fn presence(&self) -> &TipPresence {
        &self.presence
    }
}
