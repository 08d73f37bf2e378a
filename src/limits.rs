//! Size limits enforced at admission points.
//!
//! Composition data is validated against these bounds when a [`Module`] is
//! assembled; the render loop assumes they hold and never re-checks them.
//!
//! [`Module`]: crate::module::Module

/// Maximum number of control lanes in a module.
pub const CHANNELS_MAX: usize = 64;

/// Maximum number of columns in a pattern (one per channel).
pub const COLUMNS_MAX: usize = CHANNELS_MAX;

/// Maximum number of songs in a song table.
pub const SONGS_MAX: usize = 256;

/// Maximum number of patterns in a module.
pub const PATTERNS_MAX: usize = 1024;

/// Maximum number of instances of a single pattern.
pub const PAT_INSTANCES_MAX: usize = 32;

/// Maximum number of audio units (instruments and effect racks).
pub const AUDIO_UNITS_MAX: usize = 256;

/// Maximum number of processors inside one audio unit.
pub const PROCESSORS_MAX: usize = 16;

/// Maximum number of devices in the whole device graph.
pub const DEVICES_MAX: usize = AUDIO_UNITS_MAX * PROCESSORS_MAX;

/// Maximum number of simultaneous voices in the voice pool.
pub const VOICES_MAX: usize = 1024;

/// Maximum number of queued events per voice in one tick.
pub const VOICE_EVENTS_MAX: usize = 8;

/// Maximum number of tuning tables in a module.
pub const TUNING_TABLES_MAX: usize = 16;

/// Maximum number of notes in a tuning table.
pub const TUNING_TABLE_NOTES_MAX: usize = 128;

/// Maximum number of tones in an arpeggio.
pub const ARPEGGIO_TONES_MAX: usize = 64;

/// Maximum nesting depth of conditional event blocks.
pub const COND_LEVELS_MAX: usize = 32;

/// Maximum length of one serialized event entry in the event buffer, bytes.
pub const EVENT_LEN_MAX: usize = 256;

/// Maximum length of an event or variable name, bytes.
pub const NAME_LEN_MAX: usize = 32;

/// Maximum audio buffer size per render call, frames.
pub const AUDIO_BUFFER_SIZE_MAX: usize = 4096;

/// Default playback tempo in beats per minute.
pub const TEMPO_DEFAULT: f64 = 120.0;

/// Valid tempo range in beats per minute.
pub const TEMPO_MIN: f64 = 1.0;
pub const TEMPO_MAX: f64 = 999.0;
