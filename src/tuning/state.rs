//! Live retuning of a tuning table.

use super::table::TuningTable;

/// The mutable, per-playback view of one tuning table.
///
/// Retuning rotates the interval structure of the table around a fixed
/// note, so modulation between keys keeps one pitch audibly stable while
/// the others move. The accumulated deviation of the reference note from
/// its table value is tracked as drift.
#[derive(Debug, Clone)]
pub struct TuningState {
    table_index: usize,
    offsets: Vec<f64>,
    ref_note: usize,
    fixed_point: usize,
    global_offset: f64,
    drift: f64,
}

impl TuningState {
    pub fn new(table_index: usize, table: &TuningTable) -> Self {
        Self {
            table_index,
            offsets: table.note_offsets().to_vec(),
            ref_note: table.ref_note(),
            fixed_point: table.ref_note(),
            global_offset: 0.0,
            drift: 0.0,
        }
    }

    pub fn table_index(&self) -> usize {
        self.table_index
    }

    pub fn ref_note(&self) -> usize {
        self.ref_note
    }

    pub fn drift(&self) -> f64 {
        self.drift
    }

    pub fn global_offset(&self) -> f64 {
        self.global_offset
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// Restore the table's own offsets.
    pub fn reset(&mut self, table: &TuningTable) {
        self.offsets.clear();
        self.offsets.extend_from_slice(table.note_offsets());
        self.ref_note = table.ref_note();
        self.fixed_point = table.ref_note();
        self.global_offset = 0.0;
        self.drift = 0.0;
    }

    pub fn set_global_offset(&mut self, cents: f64) {
        self.global_offset = cents;
    }

    /// Set the note that stays audibly unchanged in the next retune.
    pub fn set_fixed_point(&mut self, note: usize) -> bool {
        if note >= self.offsets.len() {
            return false;
        }
        self.fixed_point = note;
        true
    }

    /// Make `new_ref` the reference note, keeping the fixed point's pitch
    /// unchanged.
    ///
    /// The live interval structure is rotated by the distance between the
    /// old and new reference, then re-anchored at the fixed point.
    pub fn retune(&mut self, new_ref: usize, table: &TuningTable) -> bool {
        let n = self.offsets.len();
        if new_ref >= n {
            return false;
        }
        let fixed = self.fixed_point;
        let shift = (n + new_ref - self.ref_note) % n;

        let mut intervals = vec![0.0; n];
        for i in 0..n - 1 {
            intervals[i] = self.offsets[i + 1] - self.offsets[i];
        }
        intervals[n - 1] = (self.offsets[0] + table.octave_width()) - self.offsets[n - 1];

        let shifted = |i: usize| (i + shift) % n;
        for i in fixed + 1..n {
            self.offsets[i] = self.offsets[i - 1] + intervals[shifted(i - 1)];
        }
        for i in (0..fixed).rev() {
            self.offsets[i] = self.offsets[i + 1] - intervals[shifted(i)];
        }

        self.ref_note = new_ref;
        self.drift = self.offsets[self.ref_note] - table.pitch_offset(self.ref_note);
        true
    }

    /// Copy live offsets from another table of the same size.
    pub fn retune_with_source(&mut self, source: &TuningTable, table: &TuningTable) -> bool {
        if source.note_count() != self.offsets.len() {
            return false;
        }
        self.offsets.clear();
        self.offsets.extend_from_slice(source.note_offsets());
        self.drift = self.offsets[self.ref_note] - table.pitch_offset(self.ref_note);
        true
    }

    /// Map a pitch in cents through the live tuning.
    ///
    /// The input snaps to the nearest note of the immutable table; the
    /// result applies that note's live offset plus the global offset.
    pub fn get_retuned_pitch(&self, cents: f64, table: &TuningTable) -> f64 {
        let w = table.octave_width();
        let rel = cents - table.ref_pitch();
        let octave = (rel / w).floor();
        let within = rel - octave * w;
        let (note, wrap) = table.nearest_note(within);
        table.ref_pitch() + octave * w + wrap + self.offsets[note] + self.global_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pythagorean_like() -> TuningTable {
        // Slightly uneven intervals make rotation observable.
        TuningTable::new(
            0,
            0.0,
            1200.0,
            vec![0.0, 90.0, 204.0, 294.0, 408.0, 498.0, 612.0, 702.0, 792.0, 906.0, 996.0,
                1110.0],
        )
        .unwrap()
    }

    #[test]
    fn test_retune_identity() {
        let table = pythagorean_like();
        let mut state = TuningState::new(0, &table);
        let before = state.offsets().to_vec();
        assert!(state.retune(state.ref_note(), &table));
        for (a, b) in before.iter().zip(state.offsets()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(state.drift(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_retune_keeps_fixed_point() {
        let table = pythagorean_like();
        let mut state = TuningState::new(0, &table);
        state.set_fixed_point(4);
        let fixed_before = state.offsets()[4];
        assert!(state.retune(2, &table));
        assert_abs_diff_eq!(state.offsets()[4], fixed_before, epsilon = 1e-9);
        assert_eq!(state.ref_note(), 2);
    }

    #[test]
    fn test_retune_back_restores_offsets() {
        let table = pythagorean_like();
        let mut state = TuningState::new(0, &table);
        let before = state.offsets().to_vec();
        assert!(state.retune(5, &table));
        assert!(state.retune(0, &table));
        for (a, b) in before.iter().zip(state.offsets()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(state.drift(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_retune_with_source_requires_same_size() {
        let table = pythagorean_like();
        let mut state = TuningState::new(0, &table);
        let small = TuningTable::new(0, 0.0, 1200.0, vec![0.0, 600.0]).unwrap();
        assert!(!state.retune_with_source(&small, &table));
        let equal = TuningTable::equal_temperament_12();
        assert!(state.retune_with_source(&equal, &table));
        assert_eq!(state.offsets()[7], 700.0);
    }

    #[test]
    fn test_get_retuned_pitch_snaps_and_offsets() {
        let table = TuningTable::equal_temperament_12();
        let mut state = TuningState::new(0, &table);
        // Untouched state maps a snapped pitch to itself.
        assert_abs_diff_eq!(state.get_retuned_pitch(700.0, &table), 700.0);
        // Octaves are preserved.
        assert_abs_diff_eq!(state.get_retuned_pitch(-1200.0, &table), -1200.0);
        // Global offset is added on top.
        state.set_global_offset(12.5);
        assert_abs_diff_eq!(state.get_retuned_pitch(700.0, &table), 712.5);
    }
}
