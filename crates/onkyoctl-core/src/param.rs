//! Parameter formatting and parsing
//!
//! Pure functions mapping friendly values to raw payload tokens and back.
//! Each [`ParamKind`](crate::ParamKind) dispatches into these; the
//! composite kinds chain two of them with a fallback.

use std::collections::BTreeMap;

use crate::command::{Command, FriendlyValue};
use crate::error::{Error, Result};

const RAW_ON: &str = "01";
const RAW_OFF: &str = "00";
const RAW_TOGGLE: &str = "TG";

/// Tolerance when checking that a scaled value is integral.
const SCALE_TOLERANCE: f64 = 1e-6;

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidParameter(message.into())
}

pub(crate) fn format_on_off(value: &FriendlyValue) -> Result<String> {
    match value {
        FriendlyValue::Bool(true) => Ok(RAW_ON.to_string()),
        FriendlyValue::Bool(false) => Ok(RAW_OFF.to_string()),
        FriendlyValue::Int(1) => Ok(RAW_ON.to_string()),
        FriendlyValue::Int(0) => Ok(RAW_OFF.to_string()),
        FriendlyValue::Float(number) if *number == 1.0 => Ok(RAW_ON.to_string()),
        FriendlyValue::Float(number) if *number == 0.0 => Ok(RAW_OFF.to_string()),
        FriendlyValue::Int(_) | FriendlyValue::Float(_) => {
            Err(invalid(format!("not an on/off value: {value}")))
        }
        FriendlyValue::Str(text) => {
            let lowered = text.to_ascii_lowercase();
            match lowered.as_str() {
                "on" => Ok(RAW_ON.to_string()),
                "off" => Ok(RAW_OFF.to_string()),
                _ => {
                    if let Ok(flag) = lowered.parse::<bool>() {
                        format_on_off(&FriendlyValue::Bool(flag))
                    } else if let Ok(number) = lowered.parse::<i64>() {
                        format_on_off(&FriendlyValue::Int(number))
                    } else {
                        Err(invalid(format!("not an on/off value: {text:?}")))
                    }
                }
            }
        }
    }
}

pub(crate) fn parse_on_off(raw: &str) -> Result<String> {
    match raw {
        RAW_ON => Ok("on".to_string()),
        RAW_OFF => Ok("off".to_string()),
        _ => Err(invalid(format!("not an on/off token: {raw:?}"))),
    }
}

pub(crate) fn format_toggle(value: &FriendlyValue) -> Result<String> {
    if let FriendlyValue::Str(text) = value {
        let lowered = text.to_ascii_lowercase();
        if lowered.is_empty() || lowered == "toggle" || lowered == "tg" {
            return Ok(RAW_TOGGLE.to_string());
        }
    }
    Err(invalid(format!("not a toggle value: {value}")))
}

pub(crate) fn parse_toggle(raw: &str) -> Result<String> {
    if raw == RAW_TOGGLE {
        Ok("toggle".to_string())
    } else {
        Err(invalid(format!("not a toggle token: {raw:?}")))
    }
}

pub(crate) fn format_on_off_toggle(value: &FriendlyValue) -> Result<String> {
    format_toggle(value).or_else(|_| format_on_off(value))
}

pub(crate) fn parse_on_off_toggle(raw: &str) -> Result<String> {
    parse_toggle(raw).or_else(|_| parse_on_off(raw))
}

pub(crate) fn format_enum(
    lookup: &BTreeMap<String, String>,
    value: &FriendlyValue,
) -> Result<String> {
    let wanted = value.to_string().to_ascii_lowercase();
    for (raw, friendly) in lookup {
        if *friendly == wanted {
            return Ok(raw.clone());
        }
    }
    Err(invalid(format!("no such value: {wanted:?}")))
}

pub(crate) fn parse_enum(lookup: &BTreeMap<String, String>, raw: &str) -> Result<String> {
    lookup
        .get(raw)
        .cloned()
        .ok_or_else(|| invalid(format!("no such entry: {raw:?}")))
}

pub(crate) fn format_enum_toggle(
    lookup: &BTreeMap<String, String>,
    value: &FriendlyValue,
) -> Result<String> {
    format_toggle(value).or_else(|_| format_enum(lookup, value))
}

pub(crate) fn parse_enum_toggle(lookup: &BTreeMap<String, String>, raw: &str) -> Result<String> {
    parse_toggle(raw).or_else(|_| parse_enum(lookup, raw))
}

/// Format a numeric value as scaled uppercase hex.
///
/// Bounds apply to the pre-scale value; the scaled product must be
/// integral, values that cannot be represented exactly are rejected
/// rather than silently rounded.
pub(crate) fn format_int_range(command: &Command, value: &FriendlyValue) -> Result<String> {
    let number = match value {
        FriendlyValue::Int(number) => *number as f64,
        FriendlyValue::Float(number) => *number,
        FriendlyValue::Str(text) => text
            .parse::<f64>()
            .map_err(|_| invalid(format!("not a numeric value: {text:?}")))?,
        FriendlyValue::Bool(_) => {
            return Err(invalid(format!("not a numeric value: {value}")));
        }
    };

    if number < command.lower || number > command.upper {
        return Err(invalid(format!(
            "value {number} out of range {}..={}",
            command.lower, command.upper
        )));
    }

    let scaled = number * command.scale_factor();
    let rounded = scaled.round();
    if (scaled - rounded).abs() > SCALE_TOLERANCE {
        return Err(invalid(format!(
            "value {number} is not representable at scale {}",
            command.scale_factor()
        )));
    }

    Ok(format_hex(rounded as i64))
}

/// Parse a scaled hex token back into the decimal friendly form.
pub(crate) fn parse_int_range(command: &Command, raw: &str) -> Result<String> {
    let numeric = i64::from_str_radix(raw, 16)
        .map_err(|_| invalid(format!("not a hex number: {raw:?}")))?;
    let value = numeric as f64 / command.scale_factor();
    if value < command.lower || value > command.upper {
        return Err(invalid(format!(
            "value {value} out of range {}..={}",
            command.lower, command.upper
        )));
    }
    Ok(format_decimal(value))
}

pub(crate) fn format_int_range_enum(command: &Command, value: &FriendlyValue) -> Result<String> {
    format_int_range(command, value).or_else(|_| format_enum(&command.lookup, value))
}

pub(crate) fn parse_int_range_enum(command: &Command, raw: &str) -> Result<String> {
    parse_int_range(command, raw).or_else(|_| parse_enum(&command.lookup, raw))
}

/// Uppercase hex, zero-padded to an even number of digits, minimum two.
fn format_hex(value: i64) -> String {
    let digits = format!("{value:X}");
    if digits.len() % 2 == 0 {
        digits
    } else {
        format!("0{digits}")
    }
}

/// Decimal rendering with a trailing `.0` stripped.
fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_padded_to_even_width() {
        assert_eq!(format_hex(0), "00");
        assert_eq!(format_hex(5), "05");
        assert_eq!(format_hex(46), "2E");
        assert_eq!(format_hex(255), "FF");
        assert_eq!(format_hex(0x1AB), "01AB");
    }

    #[test]
    fn decimal_strips_integral_fraction() {
        assert_eq!(format_decimal(23.0), "23");
        assert_eq!(format_decimal(2.5), "2.5");
        assert_eq!(format_decimal(0.0), "0");
    }
}
