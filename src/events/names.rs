//! The event name table.
//!
//! Names follow a small grammar shared with the module wire format:
//! `.x` sets a parameter, `/x` starts a slide, `/=x` sets a slide length.
//! Control-band names are prefixed `e.` (environment), audio-unit names
//! `au.`. These strings are a compatibility contract; treat every entry as
//! frozen.

use super::{EventType, ValueType};

pub(crate) struct EventSpec {
    pub ty: EventType,
    pub name: &'static str,
    pub arg: ValueType,
}

macro_rules! spec {
    ($ty:ident, $name:literal, $arg:ident) => {
        EventSpec {
            ty: EventType::$ty,
            name: $name,
            arg: ValueType::$arg,
        }
    };
}

pub(crate) static EVENT_SPECS: &[EventSpec] = &[
    // General
    spec!(Comment, "#", String),
    spec!(Cond, "?", Bool),
    spec!(IfBegin, "?if", None),
    spec!(Else, "?else", None),
    spec!(IfEnd, "?end", None),
    spec!(SetCallName, "cn", String),
    spec!(CallBool, "cb", Bool),
    spec!(CallInt, "ci", Int),
    spec!(CallFloat, "cf", Float),
    // Control
    spec!(Pause, "p+", None),
    spec!(Resume, "p-", None),
    spec!(SetGotoSubsong, ".gs", Int),
    spec!(SetGotoRow, ".gr", Tstamp),
    spec!(Goto, "g", None),
    spec!(Infinite, "i.", Bool),
    spec!(SetEnvBoolName, "e.bn", String),
    spec!(SetEnvBool, "e.b", Bool),
    spec!(SetEnvIntName, "e.in", String),
    spec!(SetEnvInt, "e.i", Int),
    spec!(SetEnvFloatName, "e.fn", String),
    spec!(SetEnvFloat, "e.f", Float),
    spec!(SetEnvTstampName, "e.tn", String),
    spec!(SetEnvTstamp, "e.t", Tstamp),
    // Master
    spec!(SetTempo, ".t", Float),
    spec!(SlideTempo, "/t", Float),
    spec!(SlideTempoLength, "/=t", Tstamp),
    spec!(SetVolume, ".v", Float),
    spec!(SlideVolume, "/v", Float),
    spec!(SlideVolumeLength, "/=v", Tstamp),
    spec!(PatternDelay, "mpd", Tstamp),
    spec!(Jump, "mj", None),
    spec!(SetJumpCounter, ".jc", Int),
    spec!(SetJumpPattern, ".jp", Int),
    spec!(SetJumpRow, ".jr", Tstamp),
    spec!(SetScale, ".s", Int),
    spec!(SetScaleOffset, ".so", Float),
    spec!(SetScaleFixedPoint, ".sfp", Int),
    spec!(RetuneScale, "mr", Int),
    // Channel
    spec!(NoteOn, "n+", Float),
    spec!(NoteOff, "n-", None),
    spec!(Hit, "h", Int),
    spec!(SetAuInput, ".a", Int),
    spec!(SetForce, ".f", Float),
    spec!(SlideForce, "/f", Float),
    spec!(SlideForceLength, "/=f", Tstamp),
    spec!(TremoloSpeed, "ts", Float),
    spec!(TremoloDepth, "td", Float),
    spec!(TremoloSpeedSlideLength, "t/=s", Tstamp),
    spec!(TremoloDepthSlideLength, "t/=d", Tstamp),
    spec!(SlidePitch, "/p", Float),
    spec!(SlidePitchLength, "/=p", Tstamp),
    spec!(VibratoSpeed, "vs", Float),
    spec!(VibratoDepth, "vd", Float),
    spec!(VibratoSpeedSlideLength, "v/=s", Tstamp),
    spec!(VibratoDepthSlideLength, "v/=d", Tstamp),
    spec!(SetLowpass, ".l", Float),
    spec!(SlideLowpass, "/l", Float),
    spec!(SlideLowpassLength, "/=l", Tstamp),
    spec!(SetResonance, ".r", Float),
    spec!(AutowahSpeed, "ws", Float),
    spec!(AutowahDepth, "wd", Float),
    spec!(AutowahSpeedSlideLength, "w/=s", Tstamp),
    spec!(AutowahDepthSlideLength, "w/=d", Tstamp),
    spec!(SetPanning, ".pn", Float),
    spec!(SlidePanning, "/pn", Float),
    spec!(SlidePanningLength, "/=pn", Tstamp),
    spec!(ArpOn, "arp+", None),
    spec!(ArpOff, "arp-", None),
    spec!(ResetArpeggio, "<arp", None),
    spec!(SetArpNote, "arpn", Float),
    spec!(SetArpIndex, "arpi", Int),
    spec!(SetArpSpeed, "arps", Float),
    spec!(SetCvName, ".cn", String),
    spec!(SetCvValue, ".cv", Realtime),
    spec!(CvCarryOn, "cv+", None),
    spec!(CvCarryOff, "cv-", None),
    spec!(SlideCv, "/cv", Float),
    spec!(SlideCvLength, "/=cv", Tstamp),
    spec!(SetStreamName, ".sn", String),
    // Audio unit
    spec!(AuSetCvName, "au.cn", String),
    spec!(AuSetCvValue, "au.c", Realtime),
    spec!(AuSetExpression, "au.e", String),
    spec!(AuSetPedal, "au.p", Float),
];

pub(crate) fn spec(ty: EventType) -> &'static EventSpec {
    EVENT_SPECS
        .iter()
        .find(|spec| spec.ty == ty)
        .expect("every event type has a table entry")
}

pub(crate) fn from_name(name: &str) -> Option<EventType> {
    EVENT_SPECS
        .iter()
        .find(|spec| spec.name == name)
        .map(|spec| spec.ty)
}
