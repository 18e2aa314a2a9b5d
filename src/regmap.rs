//! DW3000 register map, fast-command, and OTP-address constants.
//!
//! A flat list of `const`s, the way `dw3k_registers.h` declares them, rather
//! than the teacher's two-tier `Register6x`/`Register8x` enum-per-variant
//! split — this spec targets one chip with one register map, so there's no
//! variant axis to enumerate over.

use crate::bus::RegisterAddress;

// DW3000 User Manual 9. "Fast Commands"
pub const TXRXOFF: u8 = 0x00;
pub const TX: u8 = 0x01;
pub const RX: u8 = 0x02;
pub const DTX: u8 = 0x03;
pub const CLR_IRQS: u8 = 0x12;

// DW3000 User Manual 8.1. "Register map overview"
pub const DEV_ID: RegisterAddress = RegisterAddress::new(0x00, 0x00);
pub const SYS_CFG: RegisterAddress = RegisterAddress::new(0x00, 0x10);
pub const SYS_TIME: RegisterAddress = RegisterAddress::new(0x00, 0x1C);
pub const TX_FCTRL: RegisterAddress = RegisterAddress::new(0x00, 0x24);
pub const DX_TIME: RegisterAddress = RegisterAddress::new(0x00, 0x2C);
pub const SYS_STATUS: RegisterAddress = RegisterAddress::new(0x00, 0x44);
pub const RX_FINFO: RegisterAddress = RegisterAddress::new(0x00, 0x4C);
pub const RX_STAMP: RegisterAddress = RegisterAddress::new(0x00, 0x64);
pub const TX_STAMP: RegisterAddress = RegisterAddress::new(0x00, 0x74);

pub const TX_ANTD: RegisterAddress = RegisterAddress::new(0x01, 0x04);
pub const CHAN_CTRL: RegisterAddress = RegisterAddress::new(0x01, 0x14);

pub const DGC_CFG: RegisterAddress = RegisterAddress::new(0x03, 0x18);

pub const RX_CAL: RegisterAddress = RegisterAddress::new(0x04, 0x0C);
pub const RX_CAL_RESI: RegisterAddress = RegisterAddress::new(0x04, 0x14);
pub const RX_CAL_RESQ: RegisterAddress = RegisterAddress::new(0x04, 0x1C);
pub const RX_CAL_STS: RegisterAddress = RegisterAddress::new(0x04, 0x20);

pub const DTUNE0: RegisterAddress = RegisterAddress::new(0x06, 0x00);
pub const DTUNE3: RegisterAddress = RegisterAddress::new(0x06, 0x0C);
pub const DRX_CAR_INT: RegisterAddress = RegisterAddress::new(0x06, 0x29);

pub const RF_TX_CTRL1: RegisterAddress = RegisterAddress::new(0x07, 0x1A);
pub const RF_TX_CTRL2: RegisterAddress = RegisterAddress::new(0x07, 0x1C);
pub const LDO_CTRL: RegisterAddress = RegisterAddress::new(0x07, 0x48);

pub const PLL_CAL: RegisterAddress = RegisterAddress::new(0x09, 0x08);
pub const XTAL: RegisterAddress = RegisterAddress::new(0x09, 0x14);

pub const OTP_ADDR: RegisterAddress = RegisterAddress::new(0x0B, 0x04);
pub const OTP_CFG: RegisterAddress = RegisterAddress::new(0x0B, 0x08);
pub const OTP_RDATA: RegisterAddress = RegisterAddress::new(0x0B, 0x10);

pub const EVC_CTRL: RegisterAddress = RegisterAddress::new(0x0F, 0x00);
pub const EVC_PHE: RegisterAddress = RegisterAddress::new(0x0F, 0x04);
pub const EVC_RSE: RegisterAddress = RegisterAddress::new(0x0F, 0x06);
pub const EVC_FCG: RegisterAddress = RegisterAddress::new(0x0F, 0x08);
pub const EVC_FCE: RegisterAddress = RegisterAddress::new(0x0F, 0x0A);
pub const EVC_FFR: RegisterAddress = RegisterAddress::new(0x0F, 0x0C);
pub const EVC_OVR: RegisterAddress = RegisterAddress::new(0x0F, 0x0E);
pub const EVC_STO: RegisterAddress = RegisterAddress::new(0x0F, 0x10);
pub const EVC_PTO: RegisterAddress = RegisterAddress::new(0x0F, 0x12);
pub const EVC_FWTO: RegisterAddress = RegisterAddress::new(0x0F, 0x14);
pub const EVC_TXFS: RegisterAddress = RegisterAddress::new(0x0F, 0x16);
pub const EVC_HPW: RegisterAddress = RegisterAddress::new(0x0F, 0x18);
pub const EVC_SWCE: RegisterAddress = RegisterAddress::new(0x0F, 0x1A);
pub const EVC_CPQE: RegisterAddress = RegisterAddress::new(0x0F, 0x28);
pub const EVC_VWARN: RegisterAddress = RegisterAddress::new(0x0F, 0x2A);
pub const SYS_STATE: RegisterAddress = RegisterAddress::new(0x0F, 0x30);

pub const SOFT_RST: RegisterAddress = RegisterAddress::new(0x11, 0x00);
pub const SEQ_CTRL: RegisterAddress = RegisterAddress::new(0x11, 0x08);
pub const BIAS_CTRL: RegisterAddress = RegisterAddress::new(0x11, 0x1F);

pub const RX_BUFFER0: RegisterAddress = RegisterAddress::new(0x12, 0x00);
pub const TX_BUFFER: RegisterAddress = RegisterAddress::new(0x14, 0x00);

/// OTP word indices (`DW3KOTPAddress` in the original register map).
pub mod otp {
    use crate::bus::OtpAddress;

    pub const LDO_TUNE_LO: OtpAddress = OtpAddress::new(0x04);
    pub const LDO_TUNE_HI: OtpAddress = OtpAddress::new(0x05);
    pub const BIAS_TUNE: OtpAddress = OtpAddress::new(0x0A);
    pub const XTAL_TRIM: OtpAddress = OtpAddress::new(0x1E);
}

/// Magic configuration constants from the one-shot post-reset sequence.
/// Channel-5 profile only (the Open Question in spec.md §9 is resolved in
/// favor of hard-coding channel 5; the commented-out channel-9 alternatives
/// in the original source are never reached and have no counterpart here).
pub mod magic {
    pub const OTP_CFG_CH5: u16 = 0x15C0;
    pub const SYS_CFG: u32 = 0x0004_0498;
    pub const TX_FCTRL_LO_RESET: u32 = 0x1800;
    pub const CHAN_CTRL_CH5: u16 = 0x094E;
    pub const DGC_CFG: u16 = 0xE4F5;
    pub const DTUNE0: u16 = 0x100C;
    pub const DTUNE3: u32 = 0xAF5F_584C;
    pub const RF_TX_CTRL1: u8 = 0x0E;
    pub const RF_TX_CTRL2_CH5: u32 = 0x1C07_1134;
    pub const EVC_CTRL_ENABLE: u32 = 0x1;
    pub const PLL_CAL_START: u16 = 0x181;
    pub const SEQ_CTRL_AINIT2IDLE: u32 = 0x100;
    pub const LDO_CTRL_CAL: u32 = 0x105;
    pub const RX_CAL_START: u32 = 0x0002_0011;
    pub const RX_CAL_READ: u32 = 0x0003_0000;
}
