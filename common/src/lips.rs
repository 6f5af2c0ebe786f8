//! Inline parseable serial lines for diagnostic tools.
//!
//! Every line is framed as `{!<body>,0x<XOR>,!}\r\n`, where the checksum is
//! the XOR of the body bytes.

use core::fmt::Write;

use heapless::String;

use crate::config::{DPRINTF_BUFF_SIZE, Q_TIME};

pub type LipsLine = String<DPRINTF_BUFF_SIZE>;

/// Tag of a converted sample line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleTag {
    Accel,
    Mag,
    Gyro,
}

impl SampleTag {
    const fn as_str(self) -> &'static str {
        match self {
            SampleTag::Accel => "RA",
            SampleTag::Mag => "RM",
            SampleTag::Gyro => "RG",
        }
    }
}

fn q_to_f64(value: i64, frac_bits: u32) -> f64 {
    value as f64 / (1u64 << frac_bits) as f64
}

/// Wrap `body` in the frame. A line that does not fit the buffer is fatal.
pub fn frame(body: &str) -> LipsLine {
    let checksum = body.bytes().fold(0u8, |acc, b| acc ^ b);
    let mut line = LipsLine::new();
    let res = write!(line, "{{!{},0x{:02X},!}}\r\n", body, checksum);
    asf_assert!(res.is_ok(), "LIPS: Line truncated");
    line
}

fn body(args: core::fmt::Arguments<'_>) -> LipsLine {
    let mut body = LipsLine::new();
    let res = body.write_fmt(args);
    asf_assert!(res.is_ok(), "LIPS: Line truncated");
    body
}

/// Converted sample line. `axis` holds values with `axis_q` fractional bits.
pub fn raw_sample(tag: SampleTag, time_stamp: i64, axis: [i32; 3], axis_q: u32) -> LipsLine {
    let [x, y, z] = axis.map(|v| q_to_f64(v as i64, axis_q));
    frame(&body(format_args!(
        "{},{:.6},{:.6},{:.6},{:.6}",
        tag.as_str(),
        q_to_f64(time_stamp, Q_TIME),
        x,
        y,
        z
    )))
}

pub fn step_count(time_stamp: i64, count: u64) -> LipsLine {
    frame(&body(format_args!(
        "STC,{:+03.4},{},0",
        q_to_f64(time_stamp, Q_TIME),
        count
    )))
}

pub fn significant_motion(time_stamp: i64, detected: bool) -> LipsLine {
    frame(&body(format_args!(
        "SM,{:+03.4},{}",
        q_to_f64(time_stamp, Q_TIME),
        detected as u8
    )))
}
