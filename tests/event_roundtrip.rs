//! Wire-contract laws: event names, argument serialization and the event
//! buffer encoding.

use kunquat::events::{EventType, Value, ValueType};
use kunquat::tstamp::{Tstamp, BEAT};

#[test]
fn test_value_serialization_is_identity() {
    let values = [
        Value::None,
        Value::Bool(true),
        Value::Bool(false),
        Value::Int(0),
        Value::Int(-(1 << 40)),
        Value::Float(0.0),
        Value::Float(-123.456),
        Value::Tstamp(Tstamp::zero()),
        Value::Tstamp(Tstamp::new(16, BEAT - 1)),
        Value::String(String::new()),
        Value::String("carry\"on".to_string()),
    ];
    for value in values {
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value, "round trip changed {}", json);
    }
}

#[test]
fn test_event_names_resolve_back() {
    // A representative slice of every band.
    let names = [
        "#", "?", "?if", "?else", "?end", "cb", "ci", "cf", "cn", "p+", "p-", "g", "i.",
        "e.bn", "e.b", "e.in", "e.i", "e.fn", "e.f", "e.tn", "e.t", ".t", "/t", "/=t", ".v",
        "/v", "/=v", "mpd", "mj", ".jc", ".jp", ".jr", ".s", ".so", ".sfp", "mr", "n+", "n-",
        "h", ".a", ".f", "/f", "/=f", "ts", "td", "t/=s", "t/=d", "/p", "/=p", "vs", "vd",
        "v/=s", "v/=d", ".l", "/l", "/=l", ".r", "ws", "wd", "w/=s", "w/=d", ".pn", "/pn",
        "/=pn", "arp+", "arp-", "<arp", "arpn", "arpi", "arps", ".cn", ".cv", "cv+", "cv-",
        "/cv", "/=cv", ".sn", "au.cn", "au.c", "au.e", "au.p",
    ];
    for name in names {
        let ty = EventType::from_name(name)
            .unwrap_or_else(|| panic!("unknown event name {}", name));
        assert_eq!(ty.name(), name);
    }
}

#[test]
fn test_slide_grammar_arg_types() {
    // `.x` set and `/x` slide take floats, `/=x` lengths take timestamps.
    for (set, slide, length) in [
        (".f", "/f", "/=f"),
        (".l", "/l", "/=l"),
        (".pn", "/pn", "/=pn"),
        (".t", "/t", "/=t"),
        (".v", "/v", "/=v"),
    ] {
        assert_eq!(EventType::from_name(set).unwrap().arg_type(), ValueType::Float);
        assert_eq!(
            EventType::from_name(slide).unwrap().arg_type(),
            ValueType::Float
        );
        assert_eq!(
            EventType::from_name(length).unwrap().arg_type(),
            ValueType::Tstamp
        );
    }

    // LFO speed and depth get independent slide-length events.
    for length in ["t/=s", "t/=d", "v/=s", "v/=d", "w/=s", "w/=d"] {
        assert_eq!(
            EventType::from_name(length).unwrap().arg_type(),
            ValueType::Tstamp
        );
    }
}

#[test]
fn test_tstamp_wire_form_matches_event_args() {
    // The [beats, rem] form used by `get_events` parses back through the
    // generic value path.
    let ts = Tstamp::new(3, BEAT / 3);
    let json = serde_json::to_string(&Value::Tstamp(ts)).unwrap();
    let generic: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(generic[0], 3);
    assert_eq!(generic[1], BEAT / 3);
    let back: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(back.as_tstamp(), Some(ts));
}
