//! Parameter codec tests across all kinds

use std::collections::BTreeMap;

use onkyoctl_core::{Command, FriendlyValue, Group, IscpCommand, ParamKind};

fn command(group: &str, kind: ParamKind) -> Command {
    Command {
        name: String::new(),
        group: Group::try_from(group).unwrap(),
        kind,
        lower: 0.0,
        upper: 0.0,
        scale: 0,
        lookup: BTreeMap::new(),
    }
}

fn dimmer(kind: ParamKind) -> Command {
    let mut c = command("DIM", kind);
    c.lookup = [
        ("00", "bright"),
        ("01", "dim"),
        ("02", "dark"),
        ("03", "off"),
        ("08", "led-off"),
    ]
    .iter()
    .map(|(raw, friendly)| (raw.to_string(), friendly.to_string()))
    .collect();
    c
}

fn volume(kind: ParamKind) -> Command {
    let mut c = command("MVL", kind);
    c.lower = 0.0;
    c.upper = 100.0;
    c.scale = 2;
    c.lookup = [("UP", "up"), ("DOWN", "down")]
        .iter()
        .map(|(raw, friendly)| (raw.to_string(), friendly.to_string()))
        .collect();
    c
}

#[test]
fn format_on_off() {
    let c = command("PWR", ParamKind::OnOff);

    let accepted: &[(FriendlyValue, &str)] = &[
        (true.into(), "PWR01"),
        (false.into(), "PWR00"),
        (1.into(), "PWR01"),
        (0.into(), "PWR00"),
        (1.0.into(), "PWR01"),
        (0.0.into(), "PWR00"),
        ("on".into(), "PWR01"),
        ("ON".into(), "PWR01"),
        ("true".into(), "PWR01"),
        ("TRUE".into(), "PWR01"),
        ("1".into(), "PWR01"),
        ("01".into(), "PWR01"),
        ("off".into(), "PWR00"),
        ("OFF".into(), "PWR00"),
        ("false".into(), "PWR00"),
        ("FALSE".into(), "PWR00"),
        ("0".into(), "PWR00"),
        ("00".into(), "PWR00"),
    ];
    for (value, expected) in accepted {
        assert_eq!(
            c.create(value).unwrap(),
            IscpCommand::from(*expected),
            "value {value:?}"
        );
    }

    let rejected: &[FriendlyValue] = &[
        2.into(),
        0.5.into(),
        "foo".into(),
        "X".into(),
        "toggle".into(),
        "".into(),
    ];
    for value in rejected {
        assert!(c.create(value).is_err(), "value {value:?}");
    }
}

#[test]
fn format_on_off_toggle() {
    let c = command("PWR", ParamKind::OnOffToggle);

    for value in ["toggle", "TOGGLE", "tg", "TG", ""] {
        assert_eq!(
            c.create(&value.into()).unwrap(),
            IscpCommand::from("PWRTG"),
            "value {value:?}"
        );
    }
    assert_eq!(c.create(&"on".into()).unwrap(), IscpCommand::from("PWR01"));
}

#[test]
fn parse_on_off() {
    let mut c = command("PWR", ParamKind::OnOff);

    assert_eq!(c.parse("01").unwrap(), "on");
    assert_eq!(c.parse("00").unwrap(), "off");
    assert!(c.parse("xx").is_err());
    assert!(c.parse("").is_err());
    assert!(c.parse("TG").is_err());

    c.kind = ParamKind::OnOffToggle;
    assert_eq!(c.parse("TG").unwrap(), "toggle");
    assert_eq!(c.parse("01").unwrap(), "on");
}

#[test]
fn format_enum() {
    let c = dimmer(ParamKind::Enum);

    assert_eq!(c.create(&"bright".into()).unwrap(), IscpCommand::from("DIM00"));
    assert_eq!(c.create(&"off".into()).unwrap(), IscpCommand::from("DIM03"));
    // friendly values are matched case-insensitively
    assert_eq!(c.create(&"Off".into()).unwrap(), IscpCommand::from("DIM03"));

    assert!(c.create(&"unknown".into()).is_err());
    assert!(c.create(&"".into()).is_err());
    assert!(c.create(&123.into()).is_err());
    assert!(c.create(&true.into()).is_err());
    assert!(c.create(&"toggle".into()).is_err());
}

#[test]
fn format_enum_toggle() {
    let c = dimmer(ParamKind::EnumToggle);
    assert_eq!(c.create(&"toggle".into()).unwrap(), IscpCommand::from("DIMTG"));
    assert_eq!(c.create(&"dark".into()).unwrap(), IscpCommand::from("DIM02"));
}

#[test]
fn parse_enum() {
    let mut c = dimmer(ParamKind::Enum);

    assert_eq!(c.parse("03").unwrap(), "off");
    assert_eq!(c.parse("08").unwrap(), "led-off");
    assert!(c.parse("invalid").is_err());
    assert!(c.parse("123").is_err());
    assert!(c.parse("").is_err());
    assert!(c.parse("TG").is_err());

    c.kind = ParamKind::EnumToggle;
    assert_eq!(c.parse("TG").unwrap(), "toggle");
    assert_eq!(c.parse("00").unwrap(), "bright");
}

#[test]
fn format_int_range() {
    let c = volume(ParamKind::IntRangeEnum);

    assert_eq!(c.create(&23.into()).unwrap(), IscpCommand::from("MVL2E"));
    assert_eq!(c.create(&23.0.into()).unwrap(), IscpCommand::from("MVL2E"));
    assert_eq!(c.create(&2.5.into()).unwrap(), IscpCommand::from("MVL05"));
    assert_eq!(c.create(&0.into()).unwrap(), IscpCommand::from("MVL00"));

    // numeric strings
    assert_eq!(c.create(&"23.0".into()).unwrap(), IscpCommand::from("MVL2E"));
    assert_eq!(c.create(&"2.5".into()).unwrap(), IscpCommand::from("MVL05"));

    // enum entries
    assert_eq!(c.create(&"up".into()).unwrap(), IscpCommand::from("MVLUP"));
    assert_eq!(c.create(&"down".into()).unwrap(), IscpCommand::from("MVLDOWN"));

    // out of range
    assert!(c.create(&105.into()).is_err());
    assert!(c.create(&100.1.into()).is_err());
    assert!(c.create(&(-1).into()).is_err());

    // values that do not land on an integer after scaling are rejected
    assert!(c.create(&11.3.into()).is_err());
    assert!(c.create(&2.4.into()).is_err());
    assert!(c.create(&"2.1".into()).is_err());

    // wrong types
    assert!(c.create(&true.into()).is_err());
    assert!(c.create(&"abc".into()).is_err());
    assert!(c.create(&"".into()).is_err());
}

#[test]
fn parse_int_range() {
    let c = volume(ParamKind::IntRangeEnum);

    assert_eq!(c.parse("00").unwrap(), "0");
    assert_eq!(c.parse("05").unwrap(), "2.5");
    assert_eq!(c.parse("2E").unwrap(), "23");

    // enum fallback
    assert_eq!(c.parse("DOWN").unwrap(), "down");
    assert_eq!(c.parse("UP").unwrap(), "up");

    // not a number, not in the lookup
    assert!(c.parse("XX").is_err());
    assert!(c.parse("").is_err());

    // hex-parsable but out of range
    assert!(c.parse("FF").is_err());
}

#[test]
fn plain_int_range_has_no_enum_fallback() {
    let mut c = volume(ParamKind::IntRange);
    c.lookup.clear();

    assert_eq!(c.create(&23.into()).unwrap(), IscpCommand::from("MVL2E"));
    assert!(c.create(&"up".into()).is_err());
    assert!(c.parse("UP").is_err());
}

#[test]
fn scale_defaults_to_one() {
    let mut c = command("CTL", ParamKind::IntRange);
    c.lower = 0.0;
    c.upper = 100.0;
    c.scale = 0;

    assert_eq!(c.create(&23.into()).unwrap(), IscpCommand::from("CTL17"));
    assert_eq!(c.parse("17").unwrap(), "23");
    assert!(c.create(&2.5.into()).is_err());
}

#[test]
fn friendly_roundtrip() {
    // parse(format(v)) yields the canonical friendly form
    let c = volume(ParamKind::IntRangeEnum);
    for value in ["23", "2.5", "0", "up", "down"] {
        let command = c.create(&value.into()).unwrap();
        let (_, param) = command.split().unwrap();
        assert_eq!(c.parse(param).unwrap(), value, "value {value:?}");
    }

    let d = dimmer(ParamKind::Enum);
    for value in ["bright", "dim", "dark", "off", "led-off"] {
        let command = d.create(&value.into()).unwrap();
        let (_, param) = command.split().unwrap();
        assert_eq!(d.parse(param).unwrap(), value, "value {value:?}");
    }
}

#[test]
fn wire_roundtrip() {
    // format(parse(r)) yields the raw token back
    let c = dimmer(ParamKind::Enum);
    for raw in ["00", "01", "02", "03", "08"] {
        let friendly = c.parse(raw).unwrap();
        assert_eq!(c.format(&friendly.as_str().into()).unwrap(), raw);
    }

    let v = volume(ParamKind::IntRangeEnum);
    for raw in ["00", "05", "2E", "UP", "DOWN"] {
        let friendly = v.parse(raw).unwrap();
        assert_eq!(v.format(&friendly.as_str().into()).unwrap(), raw);
    }

    let p = command("PWR", ParamKind::OnOffToggle);
    for raw in ["00", "01", "TG"] {
        let friendly = p.parse(raw).unwrap();
        assert_eq!(p.format(&friendly.as_str().into()).unwrap(), raw);
    }
}
