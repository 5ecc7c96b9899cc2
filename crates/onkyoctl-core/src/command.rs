//! The friendly command model
//!
//! An [`IscpCommand`] is the raw wire form, e.g. `PWR01` (power on) or
//! `MVLUP` (master volume up): a three-character [`Group`] followed by a
//! parameter payload. A [`Command`] is the friendly wrapper around one
//! group, carrying the parameter kind and codec settings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::param;
use crate::QUERY_PARAM;

/// A low-level ISCP command such as `PWR01` or `MVLQSTN`.
///
/// Opaque ASCII of the form `GGGxxx…`; never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IscpCommand(String);

impl IscpCommand {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into the three-character group and the parameter payload.
    pub fn split(&self) -> Result<(Group, &str)> {
        if self.0.len() < 3 || !self.0.is_char_boundary(3) {
            return Err(Error::BadGroup(self.0.clone()));
        }
        let group = Group::try_from(&self.0[..3])?;
        Ok((group, &self.0[3..]))
    }
}

impl fmt::Display for IscpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IscpCommand {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for IscpCommand {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// The three-character ISCP command group, e.g. `PWR` or `MVL`.
///
/// Matched case-sensitively; always exactly three ASCII characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Group(String);

impl Group {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Construct from a literal known to be valid.
    pub(crate) fn from_static(raw: &'static str) -> Self {
        debug_assert!(raw.len() == 3 && raw.is_ascii());
        Self(raw.to_string())
    }
}

impl TryFrom<String> for Group {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if value.len() != 3 || !value.is_ascii() {
            return Err(Error::BadGroup(value));
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Group {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::try_from(value.to_string())
    }
}

impl From<Group> for String {
    fn from(group: Group) -> Self {
        group.0
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A friendly parameter value supplied by a caller.
///
/// Callers that only deal in text (the CLI does) pass everything through
/// the [`Str`](FriendlyValue::Str) variant; the permissive string path of
/// each parameter kind handles the common cases (`"on"`, `"1"`, `"23.5"`,
/// `"toggle"`).
#[derive(Debug, Clone, PartialEq)]
pub enum FriendlyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for FriendlyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FriendlyValue::Bool(value) => write!(f, "{value}"),
            FriendlyValue::Int(value) => write!(f, "{value}"),
            FriendlyValue::Float(value) => write!(f, "{value}"),
            FriendlyValue::Str(value) => f.write_str(value),
        }
    }
}

impl From<bool> for FriendlyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for FriendlyValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for FriendlyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FriendlyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FriendlyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FriendlyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// The kind of parameter expected by a command.
///
/// The composite kinds try their primary codec first and fall back to the
/// secondary one, in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamKind {
    OnOff,
    OnOffToggle,
    Enum,
    EnumToggle,
    IntRange,
    IntRangeEnum,
}

/// A single command definition: the friendly name, the wire group and the
/// parameter codec settings.
///
/// `lookup` maps raw payload tokens (`"00"`, `"UP"`) to friendly values
/// (`"bright"`, `"up"`). `lower`/`upper` bound the pre-scale value for the
/// int-range kinds; a `scale` of zero means 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    #[serde(default)]
    pub name: String,
    pub group: Group,
    #[serde(rename = "paramtype")]
    pub kind: ParamKind,
    #[serde(default)]
    pub lower: f64,
    #[serde(default)]
    pub upper: f64,
    #[serde(default)]
    pub scale: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lookup: BTreeMap<String, String>,
}

impl Command {
    /// The `GGGQSTN` query command for this definition.
    pub fn query(&self) -> IscpCommand {
        IscpCommand::new(format!("{}{}", self.group, QUERY_PARAM))
    }

    /// Create the ISCP command carrying the given friendly value.
    pub fn create(&self, value: &FriendlyValue) -> Result<IscpCommand> {
        let param = self.format(value)?;
        Ok(IscpCommand::new(format!("{}{}", self.group, param)))
    }

    /// Format a friendly value into the raw parameter token.
    pub fn format(&self, value: &FriendlyValue) -> Result<String> {
        match self.kind {
            ParamKind::OnOff => param::format_on_off(value),
            ParamKind::OnOffToggle => param::format_on_off_toggle(value),
            ParamKind::Enum => param::format_enum(&self.lookup, value),
            ParamKind::EnumToggle => param::format_enum_toggle(&self.lookup, value),
            ParamKind::IntRange => param::format_int_range(self, value),
            ParamKind::IntRangeEnum => param::format_int_range_enum(self, value),
        }
    }

    /// Parse a raw parameter token into the friendly value string.
    pub fn parse(&self, raw: &str) -> Result<String> {
        match self.kind {
            ParamKind::OnOff => param::parse_on_off(raw),
            ParamKind::OnOffToggle => param::parse_on_off_toggle(raw),
            ParamKind::Enum => param::parse_enum(&self.lookup, raw),
            ParamKind::EnumToggle => param::parse_enum_toggle(&self.lookup, raw),
            ParamKind::IntRange => param::parse_int_range(self, raw),
            ParamKind::IntRangeEnum => param::parse_int_range_enum(self, raw),
        }
    }

    pub(crate) fn scale_factor(&self) -> f64 {
        if self.scale == 0 {
            1.0
        } else {
            f64::from(self.scale)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_command() {
        let command = IscpCommand::from("PWR01");
        let (group, param) = command.split().unwrap();
        assert_eq!(group.as_str(), "PWR");
        assert_eq!(param, "01");
    }

    #[test]
    fn split_rejects_short_commands() {
        assert!(IscpCommand::from("AB").split().is_err());
        assert!(IscpCommand::from("").split().is_err());
    }

    #[test]
    fn group_must_be_three_ascii_chars() {
        assert!(Group::try_from("PWR").is_ok());
        assert!(Group::try_from("PW").is_err());
        assert!(Group::try_from("PWRX").is_err());
        assert!(Group::try_from("PÖR").is_err());
    }

    #[test]
    fn query_command() {
        let command = Command {
            name: "power".to_string(),
            group: Group::from_static("PWR"),
            kind: ParamKind::OnOff,
            lower: 0.0,
            upper: 0.0,
            scale: 0,
            lookup: BTreeMap::new(),
        };
        assert_eq!(command.query(), IscpCommand::from("PWRQSTN"));
    }
}
