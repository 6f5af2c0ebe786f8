//! Debug console. Reads text lines from a byte stream and acts on them.
//!
//! Supported lines:
//! - `log=<hex>` sets the runtime [`LogFlags`] mask.
//! - `{<hex>}` or a bare hex string is a host control packet. It is handed
//!   to the host comm task as if the host had written it.
//!
//! Every line is echoed to the log.

use embedded_io_async::Read;
use heapless::Vec;

use crate::asf::message::{Message, MsgCtrlReq, CTRL_REQ_MAX};
use crate::asf::task::TaskId;
use crate::asf::Kernel;
use crate::config::{LogFlags, COMMAND_LINE_SIZE};
use crate::logging::Bytes;

const ID: &str = "cmd_handler";

/// What a console line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetLogFlags(LogFlags),
    ControlPacket(MsgCtrlReq),
    /// Nothing to do beyond the echo
    None,
}

/// Decode a string of hex digit pairs, ignoring spaces.
fn decode_hex(text: &str) -> Option<Vec<u8, CTRL_REQ_MAX>> {
    let mut out = Vec::new();
    let mut digits = text.bytes().filter(|b| *b != b' ');

    while let Some(high) = digits.next() {
        let low = digits.next()?;
        let high = (high as char).to_digit(16)?;
        let low = (low as char).to_digit(16)?;
        out.push((high << 4 | low) as u8).ok()?;
    }

    (!out.is_empty()).then_some(out)
}

pub fn parse_line(line: &str) -> Command {
    let line = line.trim();

    if let Some(value) = line.strip_prefix("log=") {
        let value = value.trim_start_matches("0x");
        return match u32::from_str_radix(value, 16) {
            Ok(bits) => Command::SetLogFlags(LogFlags::from_bits_retain(bits)),
            Err(_) => Command::None,
        };
    }

    let hex = line
        .strip_prefix('{')
        .and_then(|l| l.strip_suffix('}'))
        .unwrap_or(line);

    decode_hex(hex)
        .and_then(|bytes| MsgCtrlReq::new(&bytes))
        .map_or(Command::None, Command::ControlPacket)
}

fn handle_line(kernel: &'static Kernel, line: &[u8]) {
    let Ok(text) = core::str::from_utf8(line) else {
        warn!("{}: Discarding non-text line {}", ID, Bytes(line));
        return;
    };

    info!("Received {} bytes: {}", line.len(), text);

    match parse_line(text) {
        Command::SetLogFlags(flags) => {
            flags.store();
            info!("{}: Log flags set to {:#x}", ID, flags.bits());
        }
        Command::ControlPacket(req) => {
            if let Err(e) = kernel.post(TaskId::HostComm, Message::CtrlReq(req)) {
                warn!("{}: Control packet dropped: {:?}", ID, e);
            }
        }
        Command::None => {}
    }
}

/// Accumulates console bytes into lines of at most [`COMMAND_LINE_SIZE`].
#[derive(Default)]
struct LineBuffer {
    line: Vec<u8, COMMAND_LINE_SIZE>,
    overflowed: bool,
}

impl LineBuffer {
    /// Feed one byte. Returns a complete line at a line terminator. Lines
    /// that overflow the buffer are discarded whole.
    fn push(&mut self, byte: u8) -> Option<&[u8]> {
        match byte {
            b'\r' | b'\n' => {
                let overflowed = core::mem::take(&mut self.overflowed);
                if overflowed {
                    warn!("{}: Line longer than {} bytes discarded", ID, COMMAND_LINE_SIZE);
                    self.line.clear();
                    None
                } else if self.line.is_empty() {
                    None
                } else {
                    Some(self.line.as_slice())
                }
            }
            _ => {
                if self.line.push(byte).is_err() {
                    self.overflowed = true;
                }
                None
            }
        }
    }

    fn clear(&mut self) {
        self.line.clear();
    }
}

pub async fn main<R: Read>(kernel: &'static Kernel, mut console: R) -> ! {
    info!("{}: Task started", ID);

    let mut lines = LineBuffer::default();
    let mut chunk = [0u8; COMMAND_LINE_SIZE];

    loop {
        let n = match console.read(&mut chunk).await {
            Ok(0) => {
                info!("{}: Console closed", ID);
                core::future::pending::<()>().await;
                continue;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("{}: Console read failed: {:?}", ID, embedded_io_async::Error::kind(&e));
                continue;
            }
        };

        for &byte in &chunk[..n] {
            if let Some(line) = lines.push(byte) {
                handle_line(kernel, line);
                lines.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_executor::block_on;
    use hex_literal::hex;

    use super::*;
    use crate::asf::testing::new_kernel;

    #[test]
    fn test_parse_log_flags() {
        assert_eq!(
            parse_line("log=48"),
            Command::SetLogFlags(LogFlags::SENSOR_LIPS | LogFlags::RESULT_LIPS)
        );
        assert_eq!(
            parse_line("log=0x10\r"),
            Command::SetLogFlags(LogFlags::HIF_TRACE)
        );
        assert_eq!(parse_line("log=zz"), Command::None);
    }

    #[test]
    fn test_parse_control_packet() {
        let expected = MsgCtrlReq::new(&hex!("20 0b 00 05 01")).unwrap();
        assert_eq!(parse_line("{200b000501}"), Command::ControlPacket(expected));
        assert_eq!(parse_line("20 0b 00 05 01"), Command::ControlPacket(expected));
    }

    #[test]
    fn test_parse_rejects_text() {
        assert_eq!(parse_line("hello"), Command::None);
        assert_eq!(parse_line("{abc}"), Command::None);
        assert_eq!(parse_line(""), Command::None);
    }

    #[test]
    fn test_line_buffer() {
        let mut lines = LineBuffer::default();
        for &b in b"ab" {
            assert!(lines.push(b).is_none());
        }
        assert_eq!(lines.push(b'\r'), Some(&b"ab"[..]));
        lines.clear();

        // Empty line between \r and \n
        assert!(lines.push(b'\n').is_none());

        for _ in 0..COMMAND_LINE_SIZE + 1 {
            lines.push(b'x');
        }
        assert!(lines.push(b'\n').is_none());
        assert!(lines.push(b'y').is_none());
        assert_eq!(lines.push(b'\n'), Some(&b"y"[..]));
    }

    #[test]
    fn test_control_packet_forwarded() {
        let kernel = new_kernel();
        handle_line(kernel, b"{200b000501}");

        let buf = block_on(kernel.receive_message(TaskId::HostComm));
        match buf.msg {
            Message::CtrlReq(ref req) => assert_eq!(req.as_bytes(), &hex!("20 0b 00 05 01")),
            ref other => panic!("unexpected {:?}", other),
        }
    }
}
