//! The hardware abstraction boundary this driver is generic over.
//!
//! Production firmware implements `Hal` against a concrete MCU's GPIO and SPI
//! peripherals; tests implement it against `mock::MockHal`. The driver itself
//! never touches a register or a pin except through this trait.

/// A board pin the driver drives or reads directly.
///
/// `CSn`/`CLK`/`MISO`/`MOSI` are named for completeness of the wiring even
/// though only [`Hal::set_cs`] (not raw pin toggling) is exercised by the bus
/// layer — a `Hal` impl over a real SPI peripheral typically owns those lines
/// as part of the peripheral's own configuration, not as bit-banged GPIOs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum Pin {
    RSTn,
    IRQ,
    WAKEUP,
    CSn,
    CLK,
    MISO,
    MOSI,
}

/// Opaque failure from the transactor. The HAL contract promises `spi_transact`
/// can fail but doesn't specify failure modes; this driver erases the
/// concrete cause at the trait boundary the same way the underlying
/// peripheral driver would erase it to a single "it didn't work" value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct HalError;

/// Bundles a board's seven DW3000 pin handles, mirroring the role the
/// teacher's `RadioPins` plays in `Radio::new`/`Sx126x::new`: a caller
/// assembles its concrete GPIO types into one of these and hands it to its
/// own `Hal` constructor, rather than passing seven positional arguments.
/// The [`Hal`] trait itself never holds one directly -- by the time the
/// driver calls `set_pin_output_low`/`read_pin` with a [`Pin`] value, the
/// concrete impl has already closed over whichever board pin that role
/// maps to -- so this type exists purely for a `Hal` impl's own
/// constructor to take, the same way `RadioPins` is just a field bag
/// `Interface` destructures into its own pin fields once.
pub struct Dw3000Pins<P> {
    pub rstn: P,
    pub irq: P,
    pub wakeup: P,
    pub csn: P,
    pub clk: P,
    pub miso: P,
    pub mosi: P,
}

pub trait Hal {
    fn set_pin_output_low(&mut self, pin: Pin);
    fn set_pin_input_with_pullup(&mut self, pin: Pin);
    fn set_pin_input(&mut self, pin: Pin);
    fn read_pin(&mut self, pin: Pin) -> bool;
    fn millis(&mut self) -> u32;
    fn delay_us(&mut self, n: u32);
    /// Drives `tx` out and captures the same number of bytes into `rx`
    /// (`tx.len() == rx.len()`). Chip-select assertion/deassertion is not
    /// this call's responsibility; see [`Hal::set_cs`].
    fn spi_transact(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), HalError>;
    fn set_cs(&mut self, asserted: bool);
}
