//! Immutable tuning tables.

use crate::error::KunquatError;
use crate::limits::TUNING_TABLE_NOTES_MAX;

/// Cents in one octave of twelve-tone equal temperament.
pub const OCTAVE_WIDTH_DEFAULT: f64 = 1200.0;

/// An immutable set of note offsets.
///
/// Each note is an offset in cents from the reference pitch; octaves repeat
/// every `octave_width` cents. The table itself never changes during
/// playback; retuning happens in [`TuningState`](super::TuningState).
#[derive(Debug, Clone)]
pub struct TuningTable {
    ref_note: usize,
    ref_pitch: f64,
    octave_width: f64,
    note_offsets: Vec<f64>,
}

impl TuningTable {
    /// Build a table from note offsets in cents.
    pub fn new(
        ref_note: usize,
        ref_pitch: f64,
        octave_width: f64,
        note_offsets: Vec<f64>,
    ) -> Result<Self, KunquatError> {
        if note_offsets.is_empty() || note_offsets.len() > TUNING_TABLE_NOTES_MAX {
            return Err(KunquatError::Format(format!(
                "tuning table must have 1..={} notes",
                TUNING_TABLE_NOTES_MAX
            )));
        }
        if ref_note >= note_offsets.len() {
            return Err(KunquatError::Format(
                "tuning table reference note out of range".to_string(),
            ));
        }
        if !(octave_width > 0.0) {
            return Err(KunquatError::Format(
                "tuning table octave width must be positive".to_string(),
            ));
        }
        Ok(Self {
            ref_note,
            ref_pitch,
            octave_width,
            note_offsets,
        })
    }

    /// Standard twelve-tone equal temperament around 440 Hz (0 cents).
    pub fn equal_temperament_12() -> Self {
        let offsets = (0..12).map(|i| f64::from(i) * 100.0).collect();
        Self::new(0, 0.0, OCTAVE_WIDTH_DEFAULT, offsets)
            .expect("12-TET table is always valid")
    }

    pub fn note_count(&self) -> usize {
        self.note_offsets.len()
    }

    pub fn ref_note(&self) -> usize {
        self.ref_note
    }

    pub fn ref_pitch(&self) -> f64 {
        self.ref_pitch
    }

    pub fn octave_width(&self) -> f64 {
        self.octave_width
    }

    /// Offset of a note in cents from the reference pitch.
    pub fn pitch_offset(&self, note: usize) -> f64 {
        self.note_offsets[note]
    }

    pub fn note_offsets(&self) -> &[f64] {
        &self.note_offsets
    }

    /// The table note nearest to a pitch, given in cents relative to the
    /// reference pitch and reduced into one octave.
    ///
    /// Returns the note index and the octave wrap in cents (zero, or plus
    /// or minus one octave width when the nearest note sits across the
    /// octave seam).
    pub fn nearest_note(&self, cents_in_octave: f64) -> (usize, f64) {
        let mut best = (0, 0.0);
        let mut best_dist = f64::INFINITY;
        for (i, &offset) in self.note_offsets.iter().enumerate() {
            // Consider the note in the adjacent octaves as well, so values
            // near the octave seam snap correctly.
            for wrap in [-self.octave_width, 0.0, self.octave_width] {
                let dist = (cents_in_octave - (offset + wrap)).abs();
                if dist < best_dist {
                    best_dist = dist;
                    best = (i, wrap);
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_checks() {
        assert!(TuningTable::new(0, 0.0, 1200.0, vec![]).is_err());
        assert!(TuningTable::new(5, 0.0, 1200.0, vec![0.0, 100.0]).is_err());
        assert!(TuningTable::new(0, 0.0, 0.0, vec![0.0]).is_err());
        assert!(TuningTable::new(0, 0.0, 1200.0, vec![0.0; 200]).is_err());
    }

    #[test]
    fn test_equal_temperament_layout() {
        let table = TuningTable::equal_temperament_12();
        assert_eq!(table.note_count(), 12);
        assert_eq!(table.pitch_offset(0), 0.0);
        assert_eq!(table.pitch_offset(9), 900.0);
    }

    #[test]
    fn test_nearest_note_snaps() {
        let table = TuningTable::equal_temperament_12();
        assert_eq!(table.nearest_note(0.0), (0, 0.0));
        assert_eq!(table.nearest_note(449.0), (4, 0.0));
        assert_eq!(table.nearest_note(451.0), (5, 0.0));
        // Near the octave seam, note 0 of the next octave is closest.
        assert_eq!(table.nearest_note(1180.0), (0, 1200.0));
    }
}
