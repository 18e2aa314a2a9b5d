//! Driver for the Qorvo DW3000 ultra-wideband transceiver.
//!
//! A caller supplies a [`hal::Hal`] implementation for its board, reads the
//! chip through [`driver::Dw3000`], and drives its state machine with
//! [`driver::Dw3000::poll`] (or blocks on a target state with
//! [`driver::Dw3000::wait`]). Everything below `driver` is plumbing: [`bus`]
//! frames transactions into the chip's header encoding, [`regs`] layers typed
//! accessors over it, and [`regmap`] is the flat constant table both build
//! from.

#![cfg_attr(not(test), no_std)]

pub mod bus;
pub mod driver;
pub mod hal;
pub mod regmap;
pub mod regs;

#[cfg(test)]
mod mock;

pub use driver::{Dw3000, Status};
pub use hal::{Dw3000Pins, Hal, HalError, Pin};

/// Diagnostic logging for [`driver::Dw3000::wait`]. Real firmware links a
/// `defmt` logger and wants these lines; the host test binary links none, so
/// the macro compiles away to nothing under `#[cfg(test)]` rather than
/// failing to link against an absent global logger.
#[cfg(not(test))]
macro_rules! log_diag {
    ($($arg:tt)*) => {
        defmt::println!($($arg)*)
    };
}

#[cfg(test)]
macro_rules! log_diag {
    ($($arg:tt)*) => {};
}

pub(crate) use log_diag;
