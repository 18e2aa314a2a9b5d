//! Typed register and OTP accessors layered over the raw bus transactions.

use crate::bus::{Bus, OtpAddress, RegisterAddress};
use crate::hal::{Hal, HalError};
use crate::regmap;

impl<H: Hal> Bus<H> {
    pub fn read_u8(&mut self, addr: RegisterAddress) -> Result<u8, HalError> {
        let mut b = [0u8; 1];
        self.read(addr, &mut b)?;
        Ok(b[0])
    }

    pub fn read_u16(&mut self, addr: RegisterAddress) -> Result<u16, HalError> {
        let mut b = [0u8; 2];
        self.read(addr, &mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    pub fn read_u32(&mut self, addr: RegisterAddress) -> Result<u32, HalError> {
        let mut b = [0u8; 4];
        self.read(addr, &mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    /// 40-bit value (e.g. `TX_STAMP`/`RX_STAMP`), zero-extended into a `u64`
    /// since there is no native `u40`.
    pub fn read_u40(&mut self, addr: RegisterAddress) -> Result<u64, HalError> {
        let lo = self.read_u32(addr)?;
        let hi = self.read_u8(addr.at(4))?;
        Ok((lo as u64) | ((hi as u64) << 32))
    }

    /// 48-bit value (`SYS_STATUS`), zero-extended into a `u64`.
    pub fn read_u48(&mut self, addr: RegisterAddress) -> Result<u64, HalError> {
        let lo = self.read_u32(addr)?;
        let hi = self.read_u16(addr.at(4))?;
        Ok((lo as u64) | ((hi as u64) << 32))
    }

    pub fn write_u8(&mut self, addr: RegisterAddress, value: u8) -> Result<(), HalError> {
        self.write(addr, &value.to_le_bytes())
    }

    pub fn write_u16(&mut self, addr: RegisterAddress, value: u16) -> Result<(), HalError> {
        self.write(addr, &value.to_le_bytes())
    }

    pub fn write_u32(&mut self, addr: RegisterAddress, value: u32) -> Result<(), HalError> {
        self.write(addr, &value.to_le_bytes())
    }

    /// Indirect OTP read: latch the word index into `OTP_ADDR`, pulse the
    /// standing OTP-read configuration into `OTP_CFG`, then read the word
    /// back out of `OTP_RDATA`. Grounded on the call sites in `dw3k.cpp`
    /// (lines 66-69) and the `OTP_ADDR`/`OTP_CFG`/`OTP_RDATA` addresses in
    /// `dw3k_registers.h`; the original's `dw3k_read_otp` body itself wasn't
    /// retained in the filtered source, so the three-step sequence here is
    /// inferred from those call sites and the register map.
    pub fn read_otp(&mut self, addr: OtpAddress) -> Result<u32, HalError> {
        self.write_u16(regmap::OTP_ADDR, addr.0 as u16)?;
        self.write_u16(regmap::OTP_CFG, regmap::magic::OTP_CFG_CH5)?;
        self.read_u32(regmap::OTP_RDATA)
    }
}
