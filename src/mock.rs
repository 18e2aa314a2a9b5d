//! A `Hal` implementation backed by an in-memory register file, standing in
//! for real silicon in tests. It decodes the same header encoding `bus.rs`
//! emits, so exercising it also checks that encoding is self-consistent —
//! the role the original C++ project filled by hand against real hardware
//! in `test_init_main.cpp`; this is the host-side equivalent, grounded in
//! the `#[cfg(test)] mod tests { ... make_uut() ... }` structure of
//! `oxidecomputer-hubris/lib/multitimer/src/lib.rs`.

use std::collections::HashMap;

use crate::bus::is_buffer_file;
use crate::hal::{Hal, HalError, Pin};
use crate::regmap;

#[derive(Default)]
pub struct MockHal {
    regs: HashMap<(u8, u16), u8>,
    /// `OTP_ADDR`/`OTP_RDATA` are an indirect pair on real silicon: the same
    /// `OTP_RDATA` address yields a different word depending on what index
    /// was last latched into `OTP_ADDR`. A flat `(file, offset)` register
    /// file can't represent that, so OTP words live in their own map keyed
    /// by index, and the two addresses are special-cased in `spi_transact`.
    otp: HashMap<u8, u32>,
    last_otp_index: u8,
    pub irq: bool,
    pub rstn_high: bool,
    millis: u32,
    pub last_command: Option<u8>,
    pub fail_next_transact: bool,
}

impl MockHal {
    pub fn new() -> Self {
        Self {
            rstn_high: true,
            ..Default::default()
        }
    }

    pub fn set_otp(&mut self, index: u8, value: u32) {
        self.otp.insert(index, value);
    }

    pub fn byte(&self, file: u8, offset: u16) -> u8 {
        *self.regs.get(&(file, offset)).unwrap_or(&0)
    }

    pub fn set_byte(&mut self, file: u8, offset: u16, value: u8) {
        self.regs.insert((file, offset), value);
    }

    pub fn set_u16(&mut self, file: u8, offset: u16, value: u16) {
        for (i, b) in value.to_le_bytes().into_iter().enumerate() {
            self.set_byte(file, offset + i as u16, b);
        }
    }

    pub fn set_u32(&mut self, file: u8, offset: u16, value: u32) {
        for (i, b) in value.to_le_bytes().into_iter().enumerate() {
            self.set_byte(file, offset + i as u16, b);
        }
    }

    pub fn set_u64(&mut self, file: u8, offset: u16, value: u64) {
        for (i, b) in value.to_le_bytes().into_iter().enumerate() {
            self.set_byte(file, offset + i as u16, b);
        }
    }

    pub fn set_bytes(&mut self, file: u8, offset: u16, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            self.set_byte(file, offset + i as u16, *b);
        }
    }

    pub fn advance_millis(&mut self, n: u32) {
        self.millis = self.millis.wrapping_add(n);
    }
}

/// `SYS_STATUS` (and any register sharing its write-one-to-clear semantics)
/// clears the bits it's written rather than storing the written value
/// verbatim, mirroring the sticky status register on real silicon.
fn is_write1_clear(file: u8, offset: u16) -> bool {
    file == 0x00 && (0x44..0x4A).contains(&offset)
}

enum Txn {
    FastCommand(u8),
    Access {
        file: u8,
        offset: u16,
        mode: u8,
        header_len: usize,
        write: bool,
    },
}

fn decode(tx: &[u8]) -> Txn {
    let b0 = tx[0];
    if tx.len() == 1 && (b0 & 0x81) == 0x81 {
        return Txn::FastCommand((b0 >> 1) & 0x3F);
    }

    let write = b0 & 0x80 != 0;
    let file = (b0 >> 1) & 0x1F;

    if b0 & 0x40 == 0 {
        return Txn::Access {
            file,
            offset: 0,
            mode: 0,
            header_len: 1,
            write,
        };
    }

    if is_buffer_file(file) {
        let offset = tx[1] as u16 | ((tx[2] as u16) << 8);
        return Txn::Access {
            file,
            offset,
            mode: 0,
            header_len: 3,
            write,
        };
    }

    let b1 = tx[1];
    let off_hi = (b0 & 0x01) as u16;
    let off_lo = ((b1 >> 2) & 0x3F) as u16;
    Txn::Access {
        file,
        offset: (off_hi << 6) | off_lo,
        mode: b1 & 0x03,
        header_len: 2,
        write,
    }
}

impl Hal for MockHal {
    fn set_pin_output_low(&mut self, pin: Pin) {
        if pin == Pin::RSTn {
            self.rstn_high = false;
        }
    }

    fn set_pin_input_with_pullup(&mut self, pin: Pin) {
        if pin == Pin::RSTn {
            self.rstn_high = true;
        }
    }

    fn set_pin_input(&mut self, _pin: Pin) {}

    fn read_pin(&mut self, pin: Pin) -> bool {
        match pin {
            Pin::IRQ => self.irq,
            Pin::RSTn => self.rstn_high,
            _ => false,
        }
    }

    fn millis(&mut self) -> u32 {
        self.millis
    }

    fn delay_us(&mut self, _n: u32) {}

    fn spi_transact(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), HalError> {
        assert_eq!(tx.len(), rx.len());
        if self.fail_next_transact {
            self.fail_next_transact = false;
            return Err(HalError);
        }

        match decode(tx) {
            Txn::FastCommand(cmd) => self.last_command = Some(cmd),
            Txn::Access {
                file,
                offset,
                mode,
                header_len,
                write,
            } => {
                let payload = tx.len() - header_len;
                if mode == 0 {
                    if write && file == regmap::OTP_ADDR.file && offset == regmap::OTP_ADDR.offset
                    {
                        self.last_otp_index = tx[header_len];
                    } else if !write
                        && file == regmap::OTP_RDATA.file
                        && offset == regmap::OTP_RDATA.offset
                    {
                        let word = self.otp.get(&self.last_otp_index).copied().unwrap_or(0);
                        rx[header_len..header_len + payload]
                            .copy_from_slice(&word.to_le_bytes()[..payload]);
                    } else if write {
                        for i in 0..payload {
                            let o = offset + i as u16;
                            let incoming = tx[header_len + i];
                            let value = if is_write1_clear(file, o) {
                                self.byte(file, o) & !incoming
                            } else {
                                incoming
                            };
                            self.set_byte(file, o, value);
                        }
                    } else {
                        for i in 0..payload {
                            rx[header_len + i] = self.byte(file, offset + i as u16);
                        }
                    }
                } else {
                    let width = payload / 2;
                    for i in 0..width {
                        let o = offset + i as u16;
                        let mask = tx[header_len + i];
                        let set = tx[header_len + width + i];
                        let cur = self.byte(file, o);
                        self.set_byte(file, o, (cur & mask) | set);
                    }
                }
            }
        }
        Ok(())
    }

    fn set_cs(&mut self, _asserted: bool) {}
}
