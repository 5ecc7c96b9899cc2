//! Command registry: friendly names and ISCP groups
//!
//! A [`CommandSet`] indexes command definitions by friendly name (for the
//! outbound direction) and by group (for the inbound direction). It is
//! built once and immutable afterwards.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::command::{Command, FriendlyValue, Group, IscpCommand, ParamKind};
use crate::error::{Error, Result};

/// A set of known commands, translating the friendly form to ISCP and
/// vice-versa.
///
/// The registry does not validate uniqueness: when two definitions share a
/// name or a group, the last one wins. Definitions with an empty name are
/// only reachable through their group.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    commands: Vec<Command>,
    by_name: HashMap<String, usize>,
    by_group: HashMap<Group, usize>,
}

impl CommandSet {
    pub fn new(commands: Vec<Command>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_group = HashMap::new();
        for (index, command) in commands.iter().enumerate() {
            if !command.name.is_empty() {
                by_name.insert(command.name.clone(), index);
            }
            by_group.insert(command.group.clone(), index);
        }
        Self {
            commands,
            by_name,
            by_group,
        }
    }

    /// Load a command set from a YAML document.
    ///
    /// The document is a list of entries with `name`, `group`, `paramtype`
    /// and, where applicable, `lower`, `upper`, `scale` and `lookup`.
    /// Unknown `paramtype` values fail the load.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let commands: Vec<Command> = serde_yaml::from_str(source)?;
        Ok(Self::new(commands))
    }

    /// Load a command set from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Look up a definition by friendly name.
    pub fn find(&self, name: &str) -> Option<&Command> {
        self.by_name.get(name).map(|&index| &self.commands[index])
    }

    fn for_name(&self, name: &str) -> Result<&Command> {
        self.find(name)
            .ok_or_else(|| Error::UnknownName(name.to_string()))
    }

    /// Create an ISCP command for the given friendly name and value.
    pub fn create_command(
        &self,
        name: &str,
        value: impl Into<FriendlyValue>,
    ) -> Result<IscpCommand> {
        let value = value.into();
        self.for_name(name)?.create(&value)
    }

    /// Create the `QSTN` query for the given friendly name.
    pub fn create_query(&self, name: &str) -> Result<IscpCommand> {
        Ok(self.for_name(name)?.query())
    }

    /// Translate an inbound ISCP command into `(name, value)`.
    pub fn read_command(&self, command: &IscpCommand) -> Result<(String, String)> {
        let (group, param) = command.split()?;
        let definition = self
            .by_group
            .get(&group)
            .map(|&index| &self.commands[index])
            .ok_or_else(|| Error::UnknownGroup(group.to_string()))?;
        let value = definition.parse(param)?;
        Ok((definition.name.clone(), value))
    }

    /// The built-in set of commonly used commands.
    pub fn default_set() -> Self {
        Self::new(vec![
            on_off("power", "PWR"),
            Command {
                name: "volume".to_string(),
                group: Group::from_static("MVL"),
                kind: ParamKind::IntRangeEnum,
                lower: 0.0,
                upper: 100.0,
                scale: 2,
                lookup: lookup(&[("UP", "up"), ("DOWN", "down")]),
            },
            Command {
                name: "mute".to_string(),
                group: Group::from_static("AMT"),
                kind: ParamKind::OnOffToggle,
                lower: 0.0,
                upper: 0.0,
                scale: 0,
                lookup: BTreeMap::new(),
            },
            on_off("speaker-a", "SPA"),
            on_off("speaker-b", "SPB"),
            enumerated(
                "dimmer",
                "DIM",
                ParamKind::Enum,
                &[
                    ("00", "bright"),
                    ("01", "dim"),
                    ("02", "dark"),
                    ("03", "off"),
                    ("08", "led-off"),
                ],
            ),
            enumerated(
                "display",
                "DIF",
                ParamKind::EnumToggle,
                &[
                    ("00", "default"),
                    ("01", "listening"),
                    ("02", "source"),
                    ("03", "mode-4"),
                ],
            ),
            enumerated(
                "input",
                "SLI",
                ParamKind::Enum,
                &[
                    ("00", "video-1"),
                    ("01", "cbl-sat"),
                    ("02", "game"),
                    ("03", "aux1"),
                    ("20", "tv-tape"),
                ],
            ),
            enumerated(
                "listen-mode",
                "LMD",
                ParamKind::Enum,
                &[
                    ("00", "stereo"),
                    ("STEREO", "stereo"),
                    ("01", "direct"),
                    ("11", "pure"),
                ],
            ),
            enumerated(
                "update",
                "UPD",
                ParamKind::Enum,
                &[("00", "no-new-firmware"), ("01", "new-firmware")],
            ),
        ])
    }
}

fn lookup(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(raw, friendly)| (raw.to_string(), friendly.to_string()))
        .collect()
}

fn on_off(name: &str, group: &'static str) -> Command {
    Command {
        name: name.to_string(),
        group: Group::from_static(group),
        kind: ParamKind::OnOff,
        lower: 0.0,
        upper: 0.0,
        scale: 0,
        lookup: BTreeMap::new(),
    }
}

fn enumerated(
    name: &str,
    group: &'static str,
    kind: ParamKind,
    entries: &[(&str, &str)],
) -> Command {
    Command {
        name: name.to_string(),
        group: Group::from_static(group),
        kind,
        lower: 0.0,
        upper: 0.0,
        scale: 0,
        lookup: lookup(entries),
    }
}
