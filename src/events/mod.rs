//! Event taxonomy and the trigger argument model.
//!
//! Every trigger in a pattern carries an [`EventType`] plus a [`Value`]
//! argument. Types are partitioned into bands by the state they mutate:
//! general (conditional execution), control (environment and playback
//! control), master (tempo, volume, jumps, scales), channel (notes and
//! per-channel expression) and audio unit (control variables).
//!
//! The short names in [`names`] are part of the module wire contract and
//! must not change.

pub mod buffer;
pub mod names;
pub mod value;

pub use buffer::EventBuffer;
pub use value::{Value, ValueType};

/// The band of state an event mutates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventCategory {
    General,
    Control,
    Master,
    Channel,
    Au,
}

/// Every event the dispatcher understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    // General: conditional execution and calls.
    Comment,
    Cond,
    IfBegin,
    Else,
    IfEnd,
    SetCallName,
    CallBool,
    CallInt,
    CallFloat,

    // Control: playback control and environment variables.
    Pause,
    Resume,
    SetGotoSubsong,
    SetGotoRow,
    Goto,
    Infinite,
    SetEnvBoolName,
    SetEnvBool,
    SetEnvIntName,
    SetEnvInt,
    SetEnvFloatName,
    SetEnvFloat,
    SetEnvTstampName,
    SetEnvTstamp,

    // Master: tempo, volume, jumps and scales.
    SetTempo,
    SlideTempo,
    SlideTempoLength,
    SetVolume,
    SlideVolume,
    SlideVolumeLength,
    PatternDelay,
    Jump,
    SetJumpCounter,
    SetJumpPattern,
    SetJumpRow,
    SetScale,
    SetScaleOffset,
    SetScaleFixedPoint,
    RetuneScale,

    // Channel: notes and per-channel expression.
    NoteOn,
    NoteOff,
    Hit,
    SetAuInput,
    SetForce,
    SlideForce,
    SlideForceLength,
    TremoloSpeed,
    TremoloDepth,
    TremoloSpeedSlideLength,
    TremoloDepthSlideLength,
    SlidePitch,
    SlidePitchLength,
    VibratoSpeed,
    VibratoDepth,
    VibratoSpeedSlideLength,
    VibratoDepthSlideLength,
    SetLowpass,
    SlideLowpass,
    SlideLowpassLength,
    SetResonance,
    AutowahSpeed,
    AutowahDepth,
    AutowahSpeedSlideLength,
    AutowahDepthSlideLength,
    SetPanning,
    SlidePanning,
    SlidePanningLength,
    ArpOn,
    ArpOff,
    ResetArpeggio,
    SetArpNote,
    SetArpIndex,
    SetArpSpeed,
    SetCvName,
    SetCvValue,
    CvCarryOn,
    CvCarryOff,
    SlideCv,
    SlideCvLength,
    SetStreamName,

    // Audio unit: control variables and expressions.
    AuSetCvName,
    AuSetCvValue,
    AuSetExpression,
    AuSetPedal,
}

impl EventType {
    /// The band of state this event mutates.
    pub fn category(self) -> EventCategory {
        use EventType::*;
        match self {
            Comment | Cond | IfBegin | Else | IfEnd | SetCallName | CallBool | CallInt
            | CallFloat => EventCategory::General,

            Pause | Resume | SetGotoSubsong | SetGotoRow | Goto | Infinite | SetEnvBoolName
            | SetEnvBool | SetEnvIntName | SetEnvInt | SetEnvFloatName | SetEnvFloat
            | SetEnvTstampName | SetEnvTstamp => EventCategory::Control,

            SetTempo | SlideTempo | SlideTempoLength | SetVolume | SlideVolume
            | SlideVolumeLength | PatternDelay | Jump | SetJumpCounter | SetJumpPattern
            | SetJumpRow | SetScale | SetScaleOffset | SetScaleFixedPoint | RetuneScale => {
                EventCategory::Master
            }

            AuSetCvName | AuSetCvValue | AuSetExpression | AuSetPedal => EventCategory::Au,

            _ => EventCategory::Channel,
        }
    }

    /// The argument type this event requires.
    pub fn arg_type(self) -> ValueType {
        names::spec(self).arg
    }

    /// The wire name of this event.
    pub fn name(self) -> &'static str {
        names::spec(self).name
    }

    /// Look up an event type by wire name.
    pub fn from_name(name: &str) -> Option<EventType> {
        names::from_name(name)
    }
}
