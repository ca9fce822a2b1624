//! `KEY:value|KEY:value` reading payload.
//!
//! Encoding always produces two decimals and a bare LF terminator.
//! Decoding accepts the fields in any order, ignores unknown keys, and
//! requires both `CPU` and `NVME` to carry a finite number.

use core::fmt::Write;

use crate::error::CodecError;

use super::Readings;

/// Request sent by the controller.
pub const POLL_REQUEST: &[u8] = b"POLL\r\n";

/// Worst case is two `f32::MIN` values at two decimals.
pub const RESPONSE_CAPACITY: usize = 128;

pub type ResponseLine = heapless::String<RESPONSE_CAPACITY>;

const CPU_KEY: &str = "CPU";
const NVME_KEY: &str = "NVME";

/// Encode a response line, terminator included.
pub fn encode_response(readings: &Readings) -> Result<ResponseLine, CodecError> {
    let mut line = ResponseLine::new();
    writeln!(line, "{CPU_KEY}:{:.2}|{NVME_KEY}:{:.2}", readings.cpu, readings.nvme)
        .map_err(|_| CodecError::TooLong)?;
    Ok(line)
}

/// Decode a response line (terminator already stripped or not).
pub fn decode_response(line: &str) -> Result<Readings, CodecError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CodecError::Malformed);
    }

    let mut cpu = None;
    let mut nvme = None;
    for pair in line.split('|') {
        let (key, value) = pair.split_once(':').ok_or(CodecError::Malformed)?;
        match key.trim() {
            CPU_KEY => cpu = Some(parse_field(CPU_KEY, value)?),
            NVME_KEY => nvme = Some(parse_field(NVME_KEY, value)?),
            _ => {}
        }
    }

    Ok(Readings {
        cpu: cpu.ok_or(CodecError::MissingField(CPU_KEY))?,
        nvme: nvme.ok_or(CodecError::MissingField(NVME_KEY))?,
    })
}

fn parse_field(key: &'static str, value: &str) -> Result<f32, CodecError> {
    match value.trim().parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CodecError::BadNumber(key)),
    }
}
