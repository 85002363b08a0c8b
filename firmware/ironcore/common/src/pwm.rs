//! Heater PWM safety timer.
//!
//! The control task arms the timer with the duty to apply. The PWM period interrupt applies that
//! duty only while the timer runs, so the heater switches off by itself if the control task stalls.
//!
//! These are the only cells that interrupt context writes.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// The number of PWM periods that an armed duty stays applied.
pub const PWM_SAFETY_PERIODS: u16 = 10;

/// Safety countdown and pending duty, updated together.
#[derive(Debug, Clone, Copy, Default)]
struct SafetyState {
    /// Remaining PWM periods.
    remaining: u16,
    /// The duty to apply while periods remain.
    pending: u8,
}

/// The heater PWM safety timer, shared between task and interrupt context.
pub struct PwmSafety {
    /// Guarded by a critical section, since the interrupt handler modifies it.
    state: Mutex<CriticalSectionRawMutex, Cell<SafetyState>>,
}

impl PwmSafety {
    /// Create a disarmed timer.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(SafetyState {
                remaining: 0,
                pending: 0,
            })),
        }
    }

    /// Apply `duty` for the next [`PWM_SAFETY_PERIODS`] periods (task context).
    pub fn arm(&self, duty: u8) {
        self.state.lock(|state| {
            state.set(SafetyState {
                remaining: PWM_SAFETY_PERIODS,
                pending: duty,
            })
        });
    }

    /// Count one elapsed PWM period, and return the duty for the next one (interrupt context).
    pub fn on_period_elapsed(&self) -> u8 {
        self.state.lock(|state| {
            let mut current = state.get();

            if current.remaining == 0 {
                return 0;
            }

            current.remaining -= 1;
            if current.remaining == 0 {
                trace!("PWM safety timer expired");
            }
            state.set(current);

            current.pending
        })
    }

    /// The duty that was armed last.
    pub fn pending(&self) -> u8 {
        self.state.lock(|state| state.get().pending)
    }

    /// The number of periods until the heater switches off.
    pub fn remaining(&self) -> u16 {
        self.state.lock(|state| state.get().remaining)
    }
}

impl Default for PwmSafety {
    fn default() -> Self {
        Self::new()
    }
}
