//! Start-up of the USB Power Delivery controller.
//!
//! Negotiation itself (policy engine, protocol layers, hard resets) runs behind [`PdController`].

use embedded_hal::delay::DelayNs;

/// Time for the controller to settle before set-up, in ms.
const SETTLE_TIME_MS: u32 = 30;

/// Errors during PD controller start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The controller did not answer on its bus.
    NotDetected,
}

/// A USB PD controller with its negotiation stack.
pub trait PdController {
    /// If true, the controller answered on its bus.
    fn probe(&mut self) -> bool;

    /// Set up the controller and start negotiation processing.
    fn start(&mut self);
}

/// Detect the controller, and start it after it settled.
pub fn start(controller: &mut impl PdController, delay: &mut impl DelayNs) -> Result<(), Error> {
    if !controller.probe() {
        warn!("No USB PD controller found");
        return Err(Error::NotDetected);
    }

    delay.delay_ms(SETTLE_TIME_MS);
    controller.start();

    info!("USB PD processing started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Controller {
        present: bool,
        started: bool,
    }

    impl PdController for Controller {
        fn probe(&mut self) -> bool {
            self.present
        }

        fn start(&mut self) {
            self.started = true;
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        total_ns: u64,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }

    #[test]
    fn starts_detected_controller() {
        let mut controller = Controller {
            present: true,
            ..Default::default()
        };
        let mut delay = RecordingDelay::default();

        assert_eq!(start(&mut controller, &mut delay), Ok(()));
        assert!(controller.started);
        assert!(delay.total_ns >= 30_000_000);
    }

    #[test]
    fn missing_controller_is_not_started() {
        let mut controller = Controller::default();
        let mut delay = RecordingDelay::default();

        assert_eq!(start(&mut controller, &mut delay), Err(Error::NotDetected));
        assert!(!controller.started);
        assert_eq!(delay.total_ns, 0);
    }
}
