//! The `~`-delimited ASCII wire protocol.
//!
//! ```text
//! <name>~<x>~<y>~<z>\n
//! ```
//!
//! One object per datagram, positions in metres as plain decimals. No
//! version, checksum, or sequence number. A payload is valid when it splits
//! into exactly four fields; anything else (keep-alives, junk lines in
//! recorded files, truncated data) is rejected and left to the caller to
//! count.

use crate::error::WireError;
use crate::sample::Sample;
use gesture_env::MAX_DATAGRAM_LEN;
use serde::{Deserialize, Serialize};

/// Field separator.
pub const DELIMITER: char = '~';

/// Inert payload the master sends while drawing is off.
pub const KEEPALIVE: &[u8] = b"DUMMYDATA\n";

/// How coordinate fields that are not numbers are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Parse the longest numeric prefix; no prefix reads as 0.
    /// Matches the deployed master/slave pairs.
    #[default]
    Lenient,

    /// Reject the message unless every coordinate is a complete number.
    Strict,
}

/// A decoded position report.
#[derive(Debug, Clone, PartialEq)]
pub struct WireMessage {
    pub name: String,
    pub sample: Sample,
}

/// Encodes one position report, newline-terminated.
pub fn encode(name: &str, sample: Sample) -> Result<String, WireError> {
    if name.is_empty() || name.contains([DELIMITER, '\n', '\r', '\0']) {
        return Err(WireError::InvalidName(name.to_string()));
    }
    if !(sample.x.is_finite() && sample.y.is_finite() && sample.z.is_finite()) {
        return Err(WireError::NonFinite);
    }

    // f64 Display never uses exponent notation
    let line = format!(
        "{name}{d}{x}{d}{y}{d}{z}\n",
        d = DELIMITER,
        x = sample.x,
        y = sample.y,
        z = sample.z
    );

    if line.len() > MAX_DATAGRAM_LEN {
        return Err(WireError::TooLong(line.len()));
    }
    Ok(line)
}

/// Decodes one datagram or recorded line.
pub fn decode(payload: &[u8], policy: DecodePolicy) -> Result<WireMessage, WireError> {
    // Senders may pad to a fixed buffer size; text ends at the first NUL
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    let text = String::from_utf8_lossy(&payload[..end]);

    let fields = split_fields(&text);
    if fields.len() != 4 {
        return Err(WireError::FieldCount(fields.len()));
    }

    let mut coords = [0.0f64; 3];
    for (i, field) in fields[1..].iter().enumerate() {
        coords[i] = match policy {
            DecodePolicy::Lenient => parse_decimal_prefix(field).map(|(v, _)| v).unwrap_or(0.0),
            DecodePolicy::Strict => parse_decimal_strict(field).ok_or_else(|| WireError::NonNumeric {
                index: i + 1,
                text: field.to_string(),
            })?,
        };
    }

    Ok(WireMessage {
        name: fields[0].to_string(),
        sample: Sample::new(coords[0], coords[1], coords[2]),
    })
}

/// Splits on the delimiter the way a line-oriented stream reader does: a
/// trailing empty field after the final delimiter is not a field.
fn split_fields(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut fields: Vec<&str> = text.split(DELIMITER).collect();
    if fields.len() > 1 && fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

/// Parses the longest decimal prefix after leading whitespace.
///
/// Returns the value and the number of bytes consumed (including the
/// skipped whitespace), or `None` if no digits were found.
pub fn parse_decimal_prefix(field: &str) -> Option<(f64, usize)> {
    let trimmed = field.trim_start();
    let skipped = field.len() - trimmed.len();
    let bytes = trimmed.as_bytes();

    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - frac_start;
        if digits > 0 {
            i = j;
        }
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts if digits follow it
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    trimmed[..i].parse::<f64>().ok().map(|v| (v, skipped + i))
}

/// Parses a field that must be a number apart from surrounding whitespace.
fn parse_decimal_strict(field: &str) -> Option<f64> {
    let body = field.trim_end();
    match parse_decimal_prefix(body) {
        Some((value, consumed)) if consumed == body.len() => Some(value),
        _ => None,
    }
}
