//! Tip presence detection and identification resistor measurement.
//!
//! A tip carries a small resistor between the sense line and ground. It is measured by comparing
//! two sense readings, one with the pull-up engaged and one with it released. Each reading needs
//! the network to settle for [`SETTLE_TIME`].
//!
//! Toggling the pull-up disturbs the temperature reading. Until the resistance is known, the tip
//! is therefore reported as disconnected, so that no temperature taken meanwhile is trusted.

use crate::board::{AdcChannel, Board};
use embassy_time::{Duration, Instant};

/// The minimum time between two sensing phase transitions.
pub const SETTLE_TIME: Duration = Duration::from_millis(100);

/// After a sensing phase transition, over-temperature does not count as tip removal for this long.
pub const GRACE_TIME: Duration = Duration::from_millis(250);

/// Margin below the tip model's maximum temperature, above which the tip counts as removed.
pub const TEMPERATURE_MARGIN_C: u32 = 5;

/// The sense line of the tip identification resistor.
pub trait SenseLine {
    /// Engage or release the sense pull-up.
    fn set_pullup(&mut self, engaged: bool);

    /// Take one raw sense reading.
    fn read(&mut self) -> u16;
}

impl<B: Board> SenseLine for B {
    fn set_pullup(&mut self, engaged: bool) {
        self.set_sense_pullup(engaged);
    }

    fn read(&mut self) -> u16 {
        self.read_adc(AdcChannel::TipSense)
    }
}

/// Parameters of the sense network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SenseConfig {
    /// The sense ADC code that corresponds to the pull-up supply.
    pub full_scale: u32,
}

impl SenseConfig {
    /// Calculate the identification resistance in 0.1 Ω from the two sense readings.
    ///
    /// Returns `None`, if the readings are degenerate (saturated). Returns zero if the pull-down
    /// reading is not below the pull-up reading.
    pub fn resistance_x10(&self, pullup_reading: u16, pulldown_reading: u16) -> Option<u16> {
        let denominator =
            pulldown_reading as i64 + self.full_scale as i64 - pullup_reading as i64;
        if denominator <= 0 {
            return None;
        }

        let numerator = (pullup_reading as i64 - pulldown_reading as i64).max(0) * 10_000;
        Some(u16::try_from(numerator / denominator).unwrap_or(u16::MAX))
    }
}

impl Default for SenseConfig {
    fn default() -> Self {
        Self { full_scale: 32768 }
    }
}

/// The phase of tip detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TipPresenceState {
    /// No tip, or the tip was removed.
    Disconnected,
    /// The pull-up is engaged, waiting for the sense line to settle.
    SensingPhaseOne,
    /// The pull-up is released, waiting for the second reading.
    SensingPhaseTwo {
        /// The sense reading that was taken with the pull-up engaged.
        pullup_reading: u16,
    },
    /// A tip with a known identification resistance.
    Connected {
        /// The identification resistance in 0.1 Ω.
        resistance_x10: u16,
    },
}

/// Tip presence state machine.
///
/// Poll it at least once per control cycle. Phase transitions are rate-limited internally.
#[derive(Debug, Clone)]
pub struct TipPresence {
    /// The sense network parameters.
    config: SenseConfig,
    /// The detection phase.
    state: TipPresenceState,
    /// The instant of the last sensing phase transition.
    last_transition: Option<Instant>,
    /// The previous over-temperature result, for edge detection.
    last_disconnected: bool,
}

impl TipPresence {
    /// Create a state machine without a tip.
    pub const fn new(config: SenseConfig) -> Self {
        Self {
            config,
            state: TipPresenceState::Disconnected,
            last_transition: None,
            last_disconnected: true,
        }
    }

    /// The current detection phase.
    pub fn state(&self) -> TipPresenceState {
        self.state
    }

    /// The measured identification resistance in 0.1 Ω, or zero while not measured.
    pub fn resistance_x10(&self) -> u16 {
        match self.state {
            TipPresenceState::Connected { resistance_x10 } => resistance_x10,
            _ => 0,
        }
    }

    /// Advance the state machine, and report whether the tip must be treated as disconnected.
    ///
    /// `tip_c` is the current tip temperature, `tip_max_c` the highest temperature of the tip
    /// model. A tip reading close to the maximum means that the thermocouple is open.
    pub fn poll(
        &mut self,
        now: Instant,
        tip_c: u32,
        tip_max_c: u32,
        sense: &mut impl SenseLine,
    ) -> bool {
        let in_grace_time = self
            .last_transition
            .and_then(|transition| now.checked_duration_since(transition))
            .is_some_and(|elapsed| elapsed < GRACE_TIME);

        let disconnected =
            tip_c > tip_max_c.saturating_sub(TEMPERATURE_MARGIN_C) && !in_grace_time;

        if disconnected != self.last_disconnected {
            if disconnected {
                info!("Tip disconnected");
                self.reset(sense);
            }
            self.last_disconnected = disconnected;
        }

        if disconnected {
            return true;
        }

        match self.state {
            TipPresenceState::Connected { .. } => return false,
            TipPresenceState::Disconnected => {
                debug!("Tip inserted, engaging sense pull-up");
                sense.set_pullup(true);
                self.enter(TipPresenceState::SensingPhaseOne, now);
            }
            TipPresenceState::SensingPhaseOne => {
                if self.is_settled(now) {
                    let pullup_reading = sense.read();
                    sense.set_pullup(false);
                    self.enter(TipPresenceState::SensingPhaseTwo { pullup_reading }, now);
                }
            }
            TipPresenceState::SensingPhaseTwo { pullup_reading } => {
                if self.is_settled(now) {
                    let pulldown_reading = sense.read();
                    self.measure(pullup_reading, pulldown_reading, now, sense);
                }
            }
        }

        // Not trusted before the resistance is known.
        true
    }

    /// Evaluate the two sense readings.
    fn measure(
        &mut self,
        pullup_reading: u16,
        pulldown_reading: u16,
        now: Instant,
        sense: &mut impl SenseLine,
    ) {
        match self.config.resistance_x10(pullup_reading, pulldown_reading) {
            None => {
                warn!(
                    "Degenerate tip sense readings {} / {}, restarting",
                    pullup_reading,
                    pulldown_reading
                );
                sense.set_pullup(true);
                self.enter(TipPresenceState::SensingPhaseOne, now);
            }
            Some(0) => {
                // Nothing measurable yet, take another pull-down reading.
                self.enter(TipPresenceState::SensingPhaseTwo { pullup_reading }, now);
            }
            Some(resistance_x10) => {
                info!("Tip connected, resistance {} x0.1 Ohm", resistance_x10);
                self.enter(TipPresenceState::Connected { resistance_x10 }, now);
            }
        }
    }

    /// If true, the sense network had time to settle since the last transition.
    fn is_settled(&self, now: Instant) -> bool {
        self.last_transition
            .and_then(|transition| now.checked_duration_since(transition))
            .is_some_and(|elapsed| elapsed >= SETTLE_TIME)
    }

    /// Move to `state`, recording the transition instant.
    fn enter(&mut self, state: TipPresenceState, now: Instant) {
        self.state = state;
        self.last_transition = Some(now);
    }

    /// Forget the measurement, so that the next tip starts a fresh one.
    fn reset(&mut self, sense: &mut impl SenseLine) {
        if !matches!(
            self.state,
            TipPresenceState::Disconnected | TipPresenceState::Connected { .. }
        ) {
            sense.set_pullup(false);
        }

        self.state = TipPresenceState::Disconnected;
        self.last_transition = None;
    }
}

impl Default for TipPresence {
    fn default() -> Self {
        Self::new(SenseConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIP_MAX_C: u32 = 450;
    const COLD_C: u32 = 25;
    const OPEN_C: u32 = 460;

    /// A sense line that replays scripted readings.
    #[derive(Default)]
    struct ScriptedSense {
        pullup: bool,
        readings: [u16; 4],
        taken: usize,
    }

    impl ScriptedSense {
        fn with(readings: &[u16]) -> Self {
            let mut sense = Self::default();
            sense.readings[..readings.len()].copy_from_slice(readings);
            sense
        }
    }

    impl SenseLine for ScriptedSense {
        fn set_pullup(&mut self, engaged: bool) {
            self.pullup = engaged;
        }

        fn read(&mut self) -> u16 {
            let reading = self.readings[self.taken];
            self.taken += 1;
            reading
        }
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn resistance_formula() {
        let config = SenseConfig::default();
        // 5000 * 10000 / (15000 + 12768)
        assert_eq!(config.resistance_x10(20000, 15000), Some(1800));
        assert_eq!(config.resistance_x10(15000, 15000), Some(0));
        assert_eq!(config.resistance_x10(14000, 15000), Some(0));
        assert_eq!(config.resistance_x10(32768, 0), None);
    }

    #[test]
    fn measures_tip_after_two_phases() {
        let mut presence = TipPresence::default();
        let mut sense = ScriptedSense::with(&[20000, 15000]);

        assert!(presence.poll(at(1000), COLD_C, TIP_MAX_C, &mut sense));
        assert_eq!(presence.state(), TipPresenceState::SensingPhaseOne);
        assert!(sense.pullup);

        // Too early.
        assert!(presence.poll(at(1050), COLD_C, TIP_MAX_C, &mut sense));
        assert_eq!(sense.taken, 0);

        assert!(presence.poll(at(1100), COLD_C, TIP_MAX_C, &mut sense));
        assert_eq!(
            presence.state(),
            TipPresenceState::SensingPhaseTwo {
                pullup_reading: 20000
            }
        );
        assert!(!sense.pullup);

        assert!(presence.poll(at(1150), COLD_C, TIP_MAX_C, &mut sense));
        assert!(presence.poll(at(1200), COLD_C, TIP_MAX_C, &mut sense));
        assert_eq!(
            presence.state(),
            TipPresenceState::Connected {
                resistance_x10: 1800
            }
        );
        assert_eq!(presence.resistance_x10(), 1800);

        assert!(!presence.poll(at(1210), COLD_C, TIP_MAX_C, &mut sense));
    }

    #[test]
    fn degenerate_reading_restarts_sensing() {
        let mut presence = TipPresence::default();
        let mut sense = ScriptedSense::with(&[32768, 0]);

        presence.poll(at(0), COLD_C, TIP_MAX_C, &mut sense);
        presence.poll(at(100), COLD_C, TIP_MAX_C, &mut sense);
        assert!(presence.poll(at(200), COLD_C, TIP_MAX_C, &mut sense));

        assert_eq!(presence.state(), TipPresenceState::SensingPhaseOne);
        assert_eq!(presence.resistance_x10(), 0);
        assert!(sense.pullup);
    }

    #[test]
    fn equal_readings_retake_pulldown() {
        let mut presence = TipPresence::default();
        let mut sense = ScriptedSense::with(&[20000, 20000, 15000]);

        presence.poll(at(0), COLD_C, TIP_MAX_C, &mut sense);
        presence.poll(at(100), COLD_C, TIP_MAX_C, &mut sense);

        // No difference between the readings yet, the pull-down reading is taken again.
        assert!(presence.poll(at(200), COLD_C, TIP_MAX_C, &mut sense));
        assert_eq!(
            presence.state(),
            TipPresenceState::SensingPhaseTwo {
                pullup_reading: 20000
            }
        );
        assert_eq!(sense.taken, 2);
        assert!(!sense.pullup);

        assert!(presence.poll(at(250), COLD_C, TIP_MAX_C, &mut sense));
        assert_eq!(sense.taken, 2);

        assert!(presence.poll(at(300), COLD_C, TIP_MAX_C, &mut sense));
        assert_eq!(sense.taken, 3);
        assert_eq!(presence.resistance_x10(), 1800);
    }

    #[test]
    fn grace_time_ends_exactly_after_last_transition() {
        let mut presence = TipPresence::default();
        let mut sense = ScriptedSense::with(&[20000, 15000]);

        presence.poll(at(0), COLD_C, TIP_MAX_C, &mut sense);
        presence.poll(at(100), COLD_C, TIP_MAX_C, &mut sense);
        presence.poll(at(200), COLD_C, TIP_MAX_C, &mut sense);
        assert_eq!(presence.resistance_x10(), 1800);

        assert!(!presence.poll(at(449), OPEN_C, TIP_MAX_C, &mut sense));
        assert_eq!(presence.resistance_x10(), 1800);

        assert!(presence.poll(at(450), OPEN_C, TIP_MAX_C, &mut sense));
        assert_eq!(presence.state(), TipPresenceState::Disconnected);
    }

    #[test]
    fn over_temperature_disconnects_after_grace_time() {
        let mut presence = TipPresence::default();
        let mut sense = ScriptedSense::with(&[20000, 15000]);

        presence.poll(at(0), COLD_C, TIP_MAX_C, &mut sense);
        presence.poll(at(100), COLD_C, TIP_MAX_C, &mut sense);
        presence.poll(at(200), COLD_C, TIP_MAX_C, &mut sense);
        assert_eq!(presence.resistance_x10(), 1800);

        // The thermocouple reads open, but the last transition is recent.
        assert!(!presence.poll(at(300), OPEN_C, TIP_MAX_C, &mut sense));
        assert_eq!(presence.resistance_x10(), 1800);

        assert!(presence.poll(at(450), OPEN_C, TIP_MAX_C, &mut sense));
        assert_eq!(presence.state(), TipPresenceState::Disconnected);
        assert_eq!(presence.resistance_x10(), 0);
    }

    #[test]
    fn threshold_is_below_maximum() {
        let mut presence = TipPresence::default();
        let mut sense = ScriptedSense::default();

        assert!(presence.poll(at(0), TIP_MAX_C - 4, TIP_MAX_C, &mut sense));
        assert_eq!(presence.state(), TipPresenceState::Disconnected);
        assert!(!sense.pullup);

        presence.poll(at(10), TIP_MAX_C - 5, TIP_MAX_C, &mut sense);
        assert_eq!(presence.state(), TipPresenceState::SensingPhaseOne);
    }

    #[test]
    fn removal_during_sensing_releases_pullup() {
        let mut presence = TipPresence::default();
        let mut sense = ScriptedSense::default();

        presence.poll(at(0), COLD_C, TIP_MAX_C, &mut sense);
        assert!(sense.pullup);

        assert!(presence.poll(at(300), OPEN_C, TIP_MAX_C, &mut sense));
        assert_eq!(presence.state(), TipPresenceState::Disconnected);
        assert!(!sense.pullup);

        // A new tip starts a fresh measurement.
        presence.poll(at(400), COLD_C, TIP_MAX_C, &mut sense);
        assert_eq!(presence.state(), TipPresenceState::SensingPhaseOne);
        assert!(sense.pullup);
    }
}
