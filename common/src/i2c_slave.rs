//! Host visible register file of the I2C slave interface.

use crate::config::{VERSION0, VERSION1, WHO_AM_I};
use crate::errors::HifError;

pub mod reg {
    pub const WHO_AM_I: u8 = 0x00;
    pub const VERSION0: u8 = 0x01;
    pub const VERSION1: u8 = 0x02;
    pub const IRQ_CAUSE: u8 = 0x03;
    pub const RD_LEN: u8 = 0x04;
    pub const ACK: u8 = 0x05;
    pub const REQUEST: u8 = 0x06;
    pub const REQ_LEN: u8 = 0x07;
    pub const SENSOR_CTRL: u8 = 0x08;
    pub const RD_MEM: u8 = 0x40;
    pub const WR_MEM: u8 = 0x60;
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqCause: u8 {
        const NEWMSG = 0x01;
        const OVERRUN = 0x02;
        const MORE = 0x04;
    }
}

/// Size of the read and write memory windows
pub const WINDOW_LEN: usize = 32;

/// Value returned for reads past the end of the register file
pub const OVERREACH: u8 = 0xCC;

const REGS_LEN: usize = reg::WR_MEM as usize + WINDOW_LEN;

pub struct RegisterMap {
    regs: [u8; REGS_LEN],
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterMap {
    pub const fn new() -> Self {
        let mut regs = [0u8; REGS_LEN];
        regs[reg::WHO_AM_I as usize] = WHO_AM_I;
        regs[reg::VERSION0 as usize] = VERSION0;
        regs[reg::VERSION1 as usize] = VERSION1;
        Self { regs }
    }

    pub fn irq_cause(&self) -> IrqCause {
        IrqCause::from_bits_truncate(self.regs[reg::IRQ_CAUSE as usize])
    }

    fn set_irq_cause(&mut self, cause: IrqCause) {
        self.regs[reg::IRQ_CAUSE as usize] = cause.bits();
    }

    /// Host read starting at `addr`. Bytes past the register file read as
    /// [`OVERREACH`].
    pub fn read(&self, addr: u8, out: &mut [u8]) {
        let src = self.regs.get(addr as usize..).unwrap_or(&[]);
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = src.get(i).copied().unwrap_or(OVERREACH);
        }
    }

    /// Load a packet into the read window and flag it to the host. Posting
    /// before the host acknowledged the previous packet marks an overrun.
    pub fn post(&mut self, packet: &[u8]) -> Result<(), HifError> {
        if packet.len() > WINDOW_LEN {
            return Err(HifError::BufferTooSmall);
        }

        let start = reg::RD_MEM as usize;
        self.regs[start..start + packet.len()].copy_from_slice(packet);
        self.regs[reg::RD_LEN as usize] = packet.len() as u8;

        let mut cause = self.irq_cause();
        if cause.contains(IrqCause::NEWMSG) {
            cause |= IrqCause::OVERRUN;
        }
        self.set_irq_cause(cause | IrqCause::NEWMSG);
        Ok(())
    }

    /// Host write starting at `addr`. A write to the write window is a
    /// request and is returned for parsing. A write to `ACK` clears the
    /// interrupt cause.
    pub fn write(&mut self, addr: u8, data: &[u8]) -> Result<Option<&[u8]>, HifError> {
        match addr {
            reg::WR_MEM => {
                if data.len() > WINDOW_LEN {
                    return Err(HifError::BufferTooSmall);
                }
                let start = reg::WR_MEM as usize;
                self.regs[start..start + data.len()].copy_from_slice(data);
                self.regs[reg::REQ_LEN as usize] = data.len() as u8;
                Ok(self.regs.get(start..start + data.len()))
            }
            reg::ACK => {
                self.acknowledge();
                Ok(None)
            }
            _ => Err(HifError::InvalidParameter),
        }
    }

    pub fn acknowledge(&mut self) {
        self.regs[reg::RD_LEN as usize] = 0;
        self.set_irq_cause(IrqCause::empty());
    }
}
