//! Power delivery and thermal sensing core of a soldering controller.
//!
//! Turns raw ADC samples into filtered temperature and voltage readings, converts heating power
//! to heater PWM duty (and back), detects tips by their identification resistor, and frees a hung
//! I2C bus.
//!
//! Hardware access is abstracted by the traits in [`board`], [`bus`] and [`usb_pd`].
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

#[macro_use]
mod fmt;

pub mod board;
pub mod bus;
pub mod config;
pub mod control;
pub mod handle;
pub mod history;
pub mod power;
pub mod presence;
pub mod pwm;
pub mod usb_pd;
pub mod voltage;

pub use board::{AdcChannel, Board, TipThermoModel, scale_adc_code};
pub use control::SensingContext;
pub use power::PowerModel;
pub use presence::{SenseConfig, TipPresenceState};
pub use pwm::PwmSafety;
