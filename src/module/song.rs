//! Songs and the song table.
//!
//! A song is an ordered list of pattern instances (its sections) plus a
//! starting tempo. The table keeps songs sparse; songs after a gap are
//! hidden from playback, matching the admission rules of the module
//! format.

use super::pattern::PatInstRef;
use crate::error::KunquatError;
use crate::limits::{SONGS_MAX, TEMPO_MAX, TEMPO_MIN};

/// One song: a section order and initial playback parameters.
#[derive(Debug, Clone)]
pub struct Song {
    tempo: f64,
    sections: Vec<PatInstRef>,
}

impl Song {
    pub fn new(tempo: f64) -> Result<Self, KunquatError> {
        if !(TEMPO_MIN..=TEMPO_MAX).contains(&tempo) {
            return Err(KunquatError::Format(format!(
                "song tempo {} out of range",
                tempo
            )));
        }
        Ok(Self {
            tempo,
            sections: Vec::new(),
        })
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn push_section(&mut self, piref: PatInstRef) {
        self.sections.push(piref);
    }

    pub fn section(&self, index: usize) -> Option<PatInstRef> {
        self.sections.get(index).copied()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

/// Sparse table of songs by song index.
#[derive(Debug, Clone, Default)]
pub struct SongTable {
    songs: Vec<Option<Song>>,
}

impl SongTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, index: usize, song: Song) -> Result<(), KunquatError> {
        if index >= SONGS_MAX {
            return Err(KunquatError::Format(format!(
                "song index {} out of range",
                index
            )));
        }
        if self.songs.len() <= index {
            self.songs.resize(index + 1, None);
        }
        self.songs[index] = Some(song);
        Ok(())
    }

    /// Get a song. Songs after an empty slot are hidden.
    pub fn get(&self, index: usize) -> Option<&Song> {
        for slot in self.songs.iter().take(index + 1) {
            if slot.is_none() {
                return None;
            }
        }
        self.songs.get(index).and_then(|slot| slot.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.songs.iter().all(|slot| slot.is_none())
    }
}
