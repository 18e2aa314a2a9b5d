//! The driver's single logical state and every operation callers issue
//! against it: reset/init/PLL/calibration, buffered and scheduled transmit,
//! receive, and the two-time-base conversions. Grounded line-for-line on
//! `dw3k.cpp`'s `dw3k_poll`/`dw3k_buffer_tx`/`dw3k_schedule_tx`/etc., folded
//! into one instance the way the teacher folds `Interface` into `Radio`.

use crate::bus::{Bus, RegisterAddress, MAX_PAYLOAD};
use crate::hal::{Hal, Pin};
use crate::regmap::{self, magic};

/// `dw3k_packet_size` in the original: the largest payload `buffer_tx` may
/// accumulate before the chip-appended 2-byte CRC pushes the wire frame past
/// 1023 bytes.
pub const MAX_TX_PAYLOAD: u16 = 1021;
const RX_WIRE_MAX: u16 = MAX_TX_PAYLOAD + 2;

const TIME32_HZ: f32 = 249_600_000.0;

/// The driver's current macro-state. Declared in this order (rather than the
/// original's, which places `Ready` near the end) because every comparison
/// the state machine makes — `status < ResetWaitPLL`, `status >=
/// ResetWaitPLL` — only cares about position relative to `ResetWaitPLL`;
/// `PartialOrd` derived over this order reproduces both without hand-written
/// comparison logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, defmt::Format)]
#[repr(u8)]
pub enum Status {
    Invalid,
    ResetActive,
    ResetWaitIRQ,
    ResetWaitPLL,
    CalibrationWait,
    Ready,
    TransmitWait,
    TransmitActive,
    TransmitDone,
    TransmitTooLate,
    ReceiveListen,
    ReceiveAnalyze,
    ReceiveDone,
    ChipError,
    CodeBug,
}

/// Owns the chip's single logical state. Generic over [`Hal`] the way the
/// teacher's `Radio` is generic over nothing but concrete to one board — this
/// driver instead takes the HAL as a type parameter so the same code serves
/// any board and `MockHal` in tests.
pub struct Dw3000<H: Hal> {
    bus: Bus<H>,
    status: Status,
    error_text: &'static str,
    reset_deadline_ms: u32,
    tx_fctrl_lo: u32,
    chan_ctrl: u16,
    buffer_len: u16,
    tx_antenna_delay: Option<u16>,
}

impl<H: Hal> Dw3000<H> {
    pub fn new(hal: H) -> Self {
        Self {
            bus: Bus::new(hal),
            status: Status::Invalid,
            error_text: "[No error logged]",
            reset_deadline_ms: 0,
            tx_fctrl_lo: 0,
            chan_ctrl: 0,
            buffer_len: 0,
            tx_antenna_delay: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    fn bug(&mut self, text: &'static str) {
        self.status = Status::CodeBug;
        self.error_text = text;
    }

    /// The bus layer promises failure only via `spi_transact` itself
    /// failing; every call site that hits this treats it the same way the
    /// teacher treats a failed `Spi_::write`/`transfer`: erase the cause,
    /// latch a chip-level error.
    fn hal_fail(&mut self) {
        self.status = Status::ChipError;
        self.error_text = "Chip: SPI error";
    }

    /// Drive `RSTn`/`WAKEUP` low as outputs, `IRQ` as input, record the reset
    /// deadline, and invalidate every cached value (the teacher's caching
    /// note in spec.md §9 calls this out explicitly). Legal from any state.
    pub fn reset(&mut self) {
        self.bus.set_pin_output_low(Pin::RSTn);
        self.bus.set_pin_output_low(Pin::WAKEUP);
        self.bus.set_pin_input(Pin::IRQ);
        self.reset_deadline_ms = self.bus.millis();
        self.status = Status::ResetActive;
        self.error_text = "[No error logged]";
        self.tx_fctrl_lo = 0;
        self.chan_ctrl = 0;
        self.buffer_len = 0;
        self.tx_antenna_delay = None;
    }

    /// One-shot post-reset configuration (`ResetWaitIRQ → ResetWaitPLL`).
    /// Grounded on `dw3k.cpp` lines 57-99. Returns `Err` only for a HAL
    /// transport failure; a bad device ID or missing OTP word is a normal
    /// diagnosed outcome, not a HAL failure, so those set `status` and
    /// return `Ok(())`.
    fn configure_after_reset(&mut self) -> Result<(), crate::hal::HalError> {
        let dev_id = self.bus.read_u32(regmap::DEV_ID)?;
        if dev_id != 0xDECA_0302 && dev_id != 0xDECA_0312 {
            self.status = Status::ChipError;
            self.error_text = "Chip: Bad device ID";
            return Ok(());
        }

        let ldo_lo = self.bus.read_otp(regmap::otp::LDO_TUNE_LO)?;
        let ldo_hi = self.bus.read_otp(regmap::otp::LDO_TUNE_HI)?;
        let bias_tune = ((self.bus.read_otp(regmap::otp::BIAS_TUNE)? >> 16) & 0x1F) as u16;
        let xtal_trim = self.bus.read_otp(regmap::otp::XTAL_TRIM)? as u8;
        if ldo_lo == 0 || ldo_hi == 0 || bias_tune == 0 || xtal_trim == 0 {
            self.status = Status::ChipError;
            self.error_text = "Chip: Missing value in OTP";
            return Ok(());
        }

        self.bus.write_u16(regmap::OTP_CFG, magic::OTP_CFG_CH5)?;
        self.bus.masked_write16(regmap::BIAS_CTRL, !0x1Fu16, bias_tune)?;
        self.bus.write_u8(regmap::XTAL, xtal_trim)?;

        self.bus.write_u32(regmap::SYS_CFG, magic::SYS_CFG)?;
        self.tx_fctrl_lo = magic::TX_FCTRL_LO_RESET;
        self.bus.write_u32(regmap::TX_FCTRL, self.tx_fctrl_lo)?;
        self.chan_ctrl = magic::CHAN_CTRL_CH5;
        self.bus.write_u16(regmap::CHAN_CTRL, self.chan_ctrl)?;
        self.bus.write_u16(regmap::DGC_CFG, magic::DGC_CFG)?;
        self.bus.write_u16(regmap::DTUNE0, magic::DTUNE0)?;
        self.bus.write_u32(regmap::DTUNE3, magic::DTUNE3)?;
        self.bus.write_u8(regmap::RF_TX_CTRL1, magic::RF_TX_CTRL1)?;
        self.bus.write_u32(regmap::RF_TX_CTRL2, magic::RF_TX_CTRL2_CH5)?;
        self.bus.write_u32(regmap::EVC_CTRL, magic::EVC_CTRL_ENABLE)?;

        self.bus.write_u16(regmap::PLL_CAL, magic::PLL_CAL_START)?;
        self.bus
            .masked_write32(regmap::SEQ_CTRL, !0u32, magic::SEQ_CTRL_AINIT2IDLE)?;
        self.status = Status::ResetWaitPLL;
        Ok(())
    }

    /// Idempotent state-machine advancement. Each `if status == X` block
    /// falls through into the next within the same call, exactly as
    /// `dw3k_poll` does, so one `poll()` invocation can legally carry the
    /// state forward through several transitions.
    pub fn poll(&mut self) -> Status {
        if matches!(self.status, Status::ChipError | Status::CodeBug) {
            return self.status;
        }

        if self.status == Status::ResetActive {
            if self.bus.millis().wrapping_sub(self.reset_deadline_ms) < 10 {
                return self.status;
            }
            if self.bus.read_pin(Pin::IRQ) {
                return self.status;
            }
            self.bus.set_pin_input_with_pullup(Pin::RSTn);
            self.status = Status::ResetWaitIRQ;
        }

        if self.status == Status::ResetWaitIRQ {
            if !self.bus.read_pin(Pin::IRQ) {
                return self.status;
            }
            if self.configure_after_reset().is_err() {
                self.hal_fail();
                return self.status;
            }
            if self.status != Status::ResetWaitPLL {
                return self.status;
            }
        }

        let Ok(sys_status) = self.bus.read_u48(regmap::SYS_STATUS) else {
            self.hal_fail();
            return self.status;
        };
        if sys_status & 0xF00020C0000 != 0 {
            self.status = Status::ChipError;
            self.error_text = "Chip: Status error";
            if sys_status & 0x00040000 != 0 {
                self.error_text = "Chip: Impulse analyzer failure";
            }
            if sys_status & 0x00080000 != 0 {
                self.error_text = "Chip: Low voltage";
            }
            if sys_status & 0x02000000 != 0 {
                self.error_text = "Chip: Clock PLL losing lock";
            }
            if sys_status & 0x10000000000 != 0 {
                self.error_text = "Chip: Command error";
            }
            if sys_status & 0xE0000000000 != 0 {
                self.error_text = "Chip: SPI error";
            }
            return self.status;
        }

        if self.status == Status::ResetWaitPLL {
            if sys_status & 0x2 == 0 {
                return self.status;
            }
            let Ok(pll_cal) = self.bus.read_u16(regmap::PLL_CAL) else {
                self.hal_fail();
                return self.status;
            };
            if pll_cal & 0x100 != 0 {
                return self.status;
            }
            if self.bus.write_u32(regmap::LDO_CTRL, magic::LDO_CTRL_CAL).is_err()
                || self.bus.write_u32(regmap::RX_CAL, magic::RX_CAL_START).is_err()
            {
                self.hal_fail();
                return self.status;
            }
            self.status = Status::CalibrationWait;
        }

        if self.status == Status::CalibrationWait {
            let Ok(rx_cal_sts) = self.bus.read_u8(regmap::RX_CAL_STS) else {
                self.hal_fail();
                return self.status;
            };
            if rx_cal_sts == 0 {
                return self.status;
            }
            if self.bus.write_u32(regmap::LDO_CTRL, 0).is_err()
                || self.bus.write_u32(regmap::RX_CAL, magic::RX_CAL_READ).is_err()
            {
                self.hal_fail();
                return self.status;
            }
            let Ok(resi) = self.bus.read_u32(regmap::RX_CAL_RESI) else {
                self.hal_fail();
                return self.status;
            };
            let Ok(resq) = self.bus.read_u32(regmap::RX_CAL_RESQ) else {
                self.hal_fail();
                return self.status;
            };
            if resi == 0x1FFF_FFFF || resq == 0x1FFF_FFFF {
                self.status = Status::ChipError;
                self.error_text = "Chip: RX calibration failed";
                return self.status;
            }
            self.status = Status::Ready;
        }

        let Ok(sys_state) = self.bus.read_u32(regmap::SYS_STATE) else {
            self.hal_fail();
            return self.status;
        };

        if self.status == Status::TransmitWait {
            if sys_status & 0xF0 != 0 {
                if self.bus.write_u32(regmap::SYS_STATUS, 0xF0).is_err() {
                    self.hal_fail();
                    return self.status;
                }
                self.status = Status::TransmitActive;
            } else if sys_status & 0x08000000 != 0 {
                if self.bus.write_u32(regmap::SYS_STATUS, 0x08000000).is_err() {
                    self.hal_fail();
                    return self.status;
                }
                self.status = Status::TransmitTooLate;
            } else if sys_state == 0x000D0000 {
                // Vendor errata: the chip settles into idle without ever
                // transmitting. See DW3000 User Manual 9.4.1.
                self.status = Status::TransmitTooLate;
            }
        }

        if self.status == Status::TransmitActive && sys_status & 0x80 != 0 {
            if self.bus.write_u32(regmap::SYS_STATUS, 0x80).is_err() {
                self.hal_fail();
                return self.status;
            }
            self.status = Status::TransmitDone;
        }

        let pmsc_state = (sys_state >> 16) & 0xFF;
        if matches!(self.status, Status::TransmitWait | Status::TransmitActive)
            && !(0x8..=0xF).contains(&pmsc_state)
        {
            let Ok(fresh) = self.bus.read_u32(regmap::SYS_STATUS) else {
                self.hal_fail();
                return self.status;
            };
            if fresh & 0xF0 == 0 {
                self.status = Status::ChipError;
                self.error_text = "Chip: PMSC not in TX state";
            }
        }

        if self.status == Status::ReceiveListen && sys_status & 0x4000 != 0 {
            if self.bus.write_u32(regmap::SYS_STATUS, 0x4000).is_err() {
                self.hal_fail();
                return self.status;
            }
            self.status = Status::ReceiveAnalyze;
        }

        if self.status == Status::ReceiveAnalyze && sys_status & 0x2000 != 0 {
            if self.bus.write_u32(regmap::SYS_STATUS, 0x2000).is_err() {
                self.hal_fail();
                return self.status;
            }
            self.status = Status::ReceiveDone;
        }

        if matches!(self.status, Status::ReceiveListen | Status::ReceiveAnalyze)
            && !(0x12..=0x19).contains(&pmsc_state)
        {
            let Ok(fresh) = self.bus.read_u32(regmap::SYS_STATUS) else {
                self.hal_fail();
                return self.status;
            };
            if fresh & 0x4400 == 0 {
                self.status = Status::ChipError;
                self.error_text = "Chip: PMSC not in RX state";
            }
        }

        self.status
    }

    /// Legal from `ResetWaitPLL` onward. Writing any byte to the low byte of
    /// `SYS_TIME` latches all four bytes atomically before the read.
    pub fn clock_t32(&mut self) -> u32 {
        if self.status < Status::ResetWaitPLL {
            self.bug("BUG: Not ready for clock_t32");
            return 0;
        }
        if self.bus.write_u8(regmap::SYS_TIME, 0).is_err() {
            self.hal_fail();
            return 0;
        }
        match self.bus.read_u32(regmap::SYS_TIME) {
            Ok(v) => v,
            Err(_) => {
                self.hal_fail();
                0
            }
        }
    }

    /// Legal from `Ready`. Appends `data` to the chip's TX buffer at the
    /// currently accumulated offset; rewrites `TX_FCTRL` only if the cached
    /// frame length actually changed.
    pub fn buffer_tx(&mut self, data: &[u8]) {
        let size = data.len() as u16;
        if u32::from(self.buffer_len) + u32::from(size) > u32::from(MAX_TX_PAYLOAD) {
            self.bug("BUG: Bad size for buffer_tx");
            return;
        }
        if self.status != Status::Ready {
            self.bug("BUG: Not ready for buffer_tx");
            return;
        }

        let addr = regmap::TX_BUFFER.at(self.buffer_len);
        for (i, chunk) in data.chunks(MAX_PAYLOAD).enumerate() {
            let chunk_addr = addr.at((i * MAX_PAYLOAD) as u16);
            if self.bus.write(chunk_addr, chunk).is_err() {
                self.hal_fail();
                return;
            }
        }
        self.buffer_len += size;

        let fctrl = (self.tx_fctrl_lo & !0x300) | u32::from(self.buffer_len + 2);
        if fctrl != self.tx_fctrl_lo {
            if self.bus.write_u32(regmap::TX_FCTRL, fctrl).is_err() {
                self.hal_fail();
                return;
            }
            self.tx_fctrl_lo = fctrl;
        }
    }

    /// Legal from `Ready`. `sched_t32` must be at least `tx_leadtime_t32()`
    /// ticks ahead of `clock_t32()`; violating this only manifests later, as
    /// `TransmitTooLate` once `poll()` observes it.
    pub fn schedule_tx(&mut self, sched_t32: u32) {
        if self.status != Status::Ready {
            self.bug("BUG: Not ready for schedule_tx");
            return;
        }
        if self.bus.write_u32(regmap::DX_TIME, sched_t32).is_err() {
            self.hal_fail();
            return;
        }
        if self.bus.fast_command(regmap::DTX).is_err() {
            self.hal_fail();
            return;
        }
        self.status = Status::TransmitWait;
    }

    /// Upper bound, in t32 ticks, on the time between this call and when the
    /// chip's radio must begin transmitting.
    pub fn tx_leadtime_t32(&mut self) -> u32 {
        if self.status < Status::ResetWaitPLL {
            self.bug("BUG: Not ready for tx_leadtime_t32");
            return 0;
        }
        let fctrl = match self.bus.read_u16(regmap::TX_FCTRL) {
            Ok(v) => v,
            Err(_) => {
                self.hal_fail();
                return 0;
            }
        };
        let pre_sym: u32 = match (fctrl >> 12) & 0xF {
            0x1 => 64,
            0x2 => 1024,
            0x3 => 4096,
            0x4 => 32,
            0x5 => 128,
            0x6 => 1536,
            0x9 => 256,
            0xA => 2048,
            0xD => 512,
            _ => {
                self.status = Status::ChipError;
                self.error_text = "Chip: Bad TXPSR value";
                return 0;
            }
        };
        let sym_count = pre_sym + if self.chan_ctrl & 0x6 == 0x4 { 16 } else { 8 };
        let sym_t: f32 = if self.chan_ctrl & 0xF8 <= 0x40 {
            993.59e-9
        } else {
            1017.63e-9
        };
        let t = sym_count as f32 * sym_t + 20e-6;
        (t * TIME32_HZ) as u32 + 1
    }

    /// Pure computation, memoizing `TX_ANTD` on first call the way the
    /// original's `static auto tx_delay40` does.
    pub fn tx_expected_t40(&mut self, sched_t32: u32) -> u64 {
        if self.status < Status::ResetWaitPLL {
            self.bug("BUG: Not ready for tx_expected_t40");
            return 0;
        }
        let delay = match self.tx_antenna_delay {
            Some(d) => d,
            None => match self.bus.read_u16(regmap::TX_ANTD) {
                Ok(d) => {
                    self.tx_antenna_delay = Some(d);
                    d
                }
                Err(_) => {
                    self.hal_fail();
                    return 0;
                }
            },
        };
        (u64::from(sched_t32 & !1u32) << 8) + u64::from(delay)
    }

    /// Legal only from `TransmitDone`.
    pub fn tx_timestamp_t40(&mut self) -> u64 {
        if self.status != Status::TransmitDone {
            self.bug("BUG: Not ready for tx_timestamp_t40");
            return 0;
        }
        match self.bus.read_u40(regmap::TX_STAMP) {
            Ok(v) => v,
            Err(_) => {
                self.hal_fail();
                0
            }
        }
    }

    /// Legal from `Ready`.
    pub fn start_rx(&mut self) {
        if self.status != Status::Ready {
            self.bug("BUG: Not ready for start_rx");
            return;
        }
        if self.bus.fast_command(regmap::RX).is_err() {
            self.hal_fail();
            return;
        }
        self.status = Status::ReceiveListen;
    }

    /// Legal from `ReceiveAnalyze` or `ReceiveDone`.
    pub fn rx_size(&mut self) -> u16 {
        if !matches!(self.status, Status::ReceiveAnalyze | Status::ReceiveDone) {
            self.bug("BUG: Not ready for rx_size");
            return 0;
        }
        let size_with_crc = match self.bus.read_u16(regmap::RX_FINFO) {
            Ok(v) => v & 0x3F,
            Err(_) => {
                self.hal_fail();
                return 0;
            }
        };
        if size_with_crc < 2 || size_with_crc > RX_WIRE_MAX {
            self.status = Status::ChipError;
            self.error_text = "Chip: Bad RX_FINFO packet size";
            return 0;
        }
        size_with_crc - 2
    }

    /// Legal from `ReceiveAnalyze` or `ReceiveDone`.
    pub fn retrieve_rx(&mut self, offset: u16, out: &mut [u8]) {
        if !matches!(self.status, Status::ReceiveAnalyze | Status::ReceiveDone) {
            self.bug("BUG: Not ready for retrieve_rx");
            return;
        }
        if u32::from(offset) + out.len() as u32 > u32::from(RX_WIRE_MAX) {
            self.bug("BUG: Bad offset/size for retrieve_rx");
            return;
        }
        let addr = regmap::RX_BUFFER0.at(offset);
        for (i, chunk) in out.chunks_mut(MAX_PAYLOAD).enumerate() {
            let chunk_addr = addr.at((i * MAX_PAYLOAD) as u16);
            if self.bus.read(chunk_addr, chunk).is_err() {
                self.hal_fail();
                return;
            }
        }
    }

    /// Legal only from `ReceiveDone`.
    pub fn rx_timestamp_t40(&mut self) -> u64 {
        if self.status != Status::ReceiveDone {
            self.bug("BUG: Not ready for rx_timestamp_t40");
            return 0;
        }
        match self.bus.read_u40(regmap::RX_STAMP) {
            Ok(v) => v,
            Err(_) => {
                self.hal_fail();
                0
            }
        }
    }

    /// Legal only from `ReceiveDone`.
    pub fn rx_clock_offset(&mut self) -> f32 {
        if self.status != Status::ReceiveDone {
            self.bug("BUG: Not ready for rx_clock_offset");
            return 0.0;
        }
        let raw = match self.bus.read_u32(regmap::DRX_CAR_INT) {
            Ok(v) => v,
            Err(_) => {
                self.hal_fail();
                return 0.0;
            }
        };
        let raw21 = raw & 0x1F_FFFF;
        let car_int = if raw21 & 0x10_0000 != 0 {
            (raw21 | 0xFFE0_0000) as i32
        } else {
            raw21 as i32
        };
        car_int as f32 * -0.5731e-9
    }

    /// Cancellation primitive for any pending TX or RX. Safe in any state;
    /// a no-op in benign ones.
    pub fn end_txrx(&mut self) {
        match self.status {
            Status::TransmitWait
            | Status::TransmitActive
            | Status::TransmitTooLate
            | Status::ReceiveListen
            | Status::ReceiveAnalyze => {
                if self.bus.fast_command(regmap::TXRXOFF).is_err() {
                    self.hal_fail();
                    return;
                }
            }
            Status::TransmitDone | Status::ReceiveDone | Status::Ready => {}
            _ => {
                self.bug("BUG: Not ready for end_txrx");
                return;
            }
        }
        self.buffer_len = 0;
        self.status = Status::Ready;
    }

    pub fn status_text(&self) -> &'static str {
        match self.status {
            Status::Invalid => "Invalid",
            Status::ResetActive => "ResetActive",
            Status::ResetWaitIRQ => "ResetWaitIRQ",
            Status::ResetWaitPLL => "ResetWaitPLL",
            Status::CalibrationWait => "CalibrationWait",
            Status::Ready => "Ready",
            Status::ReceiveListen => "ReceiveListen",
            Status::ReceiveAnalyze => "ReceiveAnalyze",
            Status::ReceiveDone => "ReceiveDone",
            Status::TransmitWait => "TransmitWait",
            Status::TransmitActive => "TransmitActive",
            Status::TransmitDone => "TransmitDone",
            Status::TransmitTooLate => "TransmitTooLate",
            Status::ChipError | Status::CodeBug => self.error_text,
        }
    }

    /// Spin-polls until `wanted` is reached or `timeout_ms` elapses (`0`
    /// means forever). Throttles its diagnostics the way `dw3k_wait_verbose`
    /// does: a status line on state change or every 10000 iterations, an
    /// event-counter sweep every 1000, a timeout check every 100.
    pub fn wait(&mut self, wanted: Status, timeout_ms: u32) -> bool {
        const COUNTERS: [RegisterAddress; 14] = [
            regmap::EVC_PHE,
            regmap::EVC_RSE,
            regmap::EVC_FCG,
            regmap::EVC_FCE,
            regmap::EVC_FFR,
            regmap::EVC_OVR,
            regmap::EVC_STO,
            regmap::EVC_PTO,
            regmap::EVC_FWTO,
            regmap::EVC_TXFS,
            regmap::EVC_HPW,
            regmap::EVC_SWCE,
            regmap::EVC_CPQE,
            regmap::EVC_VWARN,
        ];

        let mut counter_values = [-1i32; 14];
        let start_ms = self.bus.millis();
        let mut last_status = Status::Invalid;
        let mut i: u32 = 0;

        loop {
            let status = self.poll();
            if status != last_status || i % 10000 == 0 {
                crate::log_diag!("DW3K {}...", status);
            }

            if i % 1000 == 0 && status >= Status::ResetWaitPLL {
                let mut changed = false;
                for (idx, addr) in COUNTERS.iter().enumerate() {
                    if let Ok(v) = self.bus.read_u16(*addr) {
                        let v = i32::from(v);
                        if (v > 0 || counter_values[idx] >= 0) && v != counter_values[idx] {
                            counter_values[idx] = v;
                            changed = true;
                        }
                    }
                }
                if changed {
                    crate::log_diag!("DW3K counters changed");
                }
            }

            if status == wanted {
                return true;
            }

            if timeout_ms != 0 && i % 100 == 0 && self.bus.millis().wrapping_sub(start_ms) >= timeout_ms {
                return false;
            }

            self.bus.delay_us(10);
            last_status = status;
            i = i.wrapping_add(1);
        }
    }
}
