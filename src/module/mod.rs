//! The immutable composition consumed by playback.
//!
//! A module arrives fully assembled from an external loader: patterns,
//! songs, the track list, audio units with their processors, tuning
//! tables and the environment. Once sealed it never changes; the player
//! only reads it.

pub mod audio_unit;
pub mod pattern;
pub mod song;
pub mod track_list;

pub use audio_unit::{AuTable, AudioUnit, ControlVarDecl};
pub use pattern::{Column, PatInstRef, Pattern, Trigger};
pub use song::{Song, SongTable};
pub use track_list::TrackList;

use crate::devices::DeviceGraph;
use crate::environment::Environment;
use crate::error::KunquatError;
use crate::limits::{CHANNELS_MAX, PATTERNS_MAX, TUNING_TABLES_MAX};
use crate::tuning::TuningTable;

/// Default mixing volume in dB.
pub const MIX_VOL_DEFAULT: f64 = -8.0;

/// One complete composition.
pub struct Module {
    patterns: Vec<Option<Pattern>>,
    song_table: SongTable,
    track_list: TrackList,
    aus: AuTable,
    tuning_tables: Vec<Option<TuningTable>>,
    environment: Environment,
    graph: DeviceGraph,
    channel_au_inputs: [usize; CHANNELS_MAX],
    mix_volume: f64,
    random_seed: u64,
}

impl Module {
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
            song_table: SongTable::new(),
            track_list: TrackList::new(),
            aus: AuTable::new(),
            tuning_tables: Vec::new(),
            environment: Environment::new(),
            graph: DeviceGraph::new(),
            channel_au_inputs: [0; CHANNELS_MAX],
            mix_volume: MIX_VOL_DEFAULT,
            random_seed: 1,
        }
    }

    pub fn set_pattern(&mut self, index: usize, pattern: Pattern) -> Result<(), KunquatError> {
        if index >= PATTERNS_MAX {
            return Err(KunquatError::Format(format!(
                "pattern index {} out of range",
                index
            )));
        }
        if self.patterns.len() <= index {
            self.patterns.resize_with(index + 1, || None);
        }
        self.patterns[index] = Some(pattern);
        Ok(())
    }

    pub fn pattern(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index).and_then(|slot| slot.as_ref())
    }

    pub fn pattern_by_ref(&self, piref: PatInstRef) -> Option<&Pattern> {
        self.pattern(piref.pattern as usize)
    }

    pub fn song_table(&self) -> &SongTable {
        &self.song_table
    }

    pub fn song_table_mut(&mut self) -> &mut SongTable {
        &mut self.song_table
    }

    pub fn track_list(&self) -> &TrackList {
        &self.track_list
    }

    pub fn track_list_mut(&mut self) -> &mut TrackList {
        &mut self.track_list
    }

    pub fn audio_units(&self) -> &AuTable {
        &self.aus
    }

    pub fn audio_units_mut(&mut self) -> &mut AuTable {
        &mut self.aus
    }

    pub fn set_tuning_table(
        &mut self,
        index: usize,
        table: TuningTable,
    ) -> Result<(), KunquatError> {
        if index >= TUNING_TABLES_MAX {
            return Err(KunquatError::Format(format!(
                "tuning table index {} out of range",
                index
            )));
        }
        if self.tuning_tables.len() <= index {
            self.tuning_tables.resize_with(index + 1, || None);
        }
        self.tuning_tables[index] = Some(table);
        Ok(())
    }

    pub fn tuning_table(&self, index: usize) -> Option<&TuningTable> {
        self.tuning_tables
            .get(index)
            .and_then(|slot| slot.as_ref())
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    pub fn graph(&self) -> &DeviceGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut DeviceGraph {
        &mut self.graph
    }

    /// The audio unit a channel drives by default.
    pub fn channel_au_input(&self, ch: usize) -> usize {
        self.channel_au_inputs[ch]
    }

    pub fn set_channel_au_input(&mut self, ch: usize, au: usize) -> Result<(), KunquatError> {
        if ch >= CHANNELS_MAX {
            return Err(KunquatError::Format(format!(
                "channel {} out of range",
                ch
            )));
        }
        self.channel_au_inputs[ch] = au;
        Ok(())
    }

    pub fn mix_volume(&self) -> f64 {
        self.mix_volume
    }

    pub fn set_mix_volume(&mut self, db: f64) {
        self.mix_volume = db;
    }

    pub fn random_seed(&self) -> u64 {
        self.random_seed
    }

    pub fn set_random_seed(&mut self, seed: u64) {
        self.random_seed = seed;
    }

    /// Seal the module for playback.
    pub fn seal(&mut self) -> Result<(), KunquatError> {
        if !self.graph.is_sealed() {
            self.graph.seal()?;
        }
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.graph.is_sealed()
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tstamp::Tstamp;

    #[test]
    fn test_empty_module_seals() {
        let mut module = Module::new();
        assert!(module.seal().is_ok());
        assert!(module.is_sealed());
    }

    #[test]
    fn test_pattern_table_bounds() {
        let mut module = Module::new();
        assert!(module
            .set_pattern(PATTERNS_MAX, Pattern::new(Tstamp::from_beats(4)))
            .is_err());
        assert!(module
            .set_pattern(3, Pattern::new(Tstamp::from_beats(4)))
            .is_ok());
        assert!(module.pattern(3).is_some());
        assert!(module.pattern(2).is_none());
    }

    #[test]
    fn test_channel_au_inputs() {
        let mut module = Module::new();
        module.set_channel_au_input(5, 2).unwrap();
        assert_eq!(module.channel_au_input(5), 2);
        assert_eq!(module.channel_au_input(0), 0);
        assert!(module.set_channel_au_input(CHANNELS_MAX, 0).is_err());
    }
}
