//! The voice pool.
//!
//! A fixed array of voice slots plus a steal-order heap. Callers refer to
//! voices by `(pool_index, id)`; the id is a generation counter, so a
//! lookup with a stolen voice's pair returns nothing instead of a slot
//! that now belongs to another note.
//!
//! Steal order is `(priority, id, pool_index)` ascending: free slots
//! first, then near-silent background voices, then audible background
//! voices, then foreground, oldest first within a class. Stealing a voice
//! takes its whole group with it.

use super::voice::{Voice, VoicePrio};
use crate::error::KunquatError;
use crate::memory::Memory;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct StealKey {
    rank: u8,
    id: u64,
    pool_index: usize,
}

fn rank_of(voice: &Voice) -> u8 {
    match voice.prio() {
        VoicePrio::Inactive => 0,
        VoicePrio::Bg if voice.is_near_silent() => 1,
        VoicePrio::Bg => 2,
        VoicePrio::Fg => 3,
    }
}

/// Fixed-capacity pool of polyphonic voices.
pub struct VoicePool {
    voices: Vec<Voice>,
    heap: BinaryHeap<Reverse<StealKey>>,
    next_id: u64,
    next_group_id: u64,
}

impl VoicePool {
    /// Create a pool with `size` voice slots.
    pub fn new(size: usize, memory: &Memory) -> Result<Self, KunquatError> {
        Self::check_size(size)?;
        if !memory.claim_many(size) {
            return Err(KunquatError::Resource("voice pool allocation"));
        }
        let mut pool = Self {
            voices: (0..size).map(Voice::new).collect(),
            heap: BinaryHeap::with_capacity(size),
            next_id: 1,
            next_group_id: 1,
        };
        pool.refresh_steal_order();
        Ok(pool)
    }

    fn check_size(size: usize) -> Result<(), KunquatError> {
        if !(2..=crate::limits::VOICES_MAX).contains(&size) {
            return Err(KunquatError::Argument(format!(
                "voice count {} out of range 2..={}",
                size,
                crate::limits::VOICES_MAX
            )));
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.voices.len()
    }

    /// Change the pool size; all voices are reclaimed.
    pub fn set_size(&mut self, size: usize, memory: &Memory) -> Result<(), KunquatError> {
        Self::check_size(size)?;
        if size > self.voices.len() && !memory.claim_many(size - self.voices.len()) {
            return Err(KunquatError::Resource("voice pool growth"));
        }
        self.voices.truncate(size);
        for voice in &mut self.voices {
            voice.reset();
        }
        let len = self.voices.len();
        self.voices
            .extend((len..size).map(Voice::new));
        self.refresh_steal_order();
        Ok(())
    }

    /// A fresh group id for one note-on.
    pub fn new_group_id(&mut self) -> u64 {
        let id = self.next_group_id;
        self.next_group_id += 1;
        id
    }

    /// Rebuild the steal-order heap from current voice states.
    ///
    /// Called at chunk boundaries; allocations between rebuilds pop in
    /// logarithmic time with lazy invalidation of stale entries.
    pub fn refresh_steal_order(&mut self) {
        self.heap.clear();
        for voice in &self.voices {
            self.heap.push(Reverse(StealKey {
                rank: rank_of(voice),
                id: voice.id(),
                pool_index: voice.pool_index(),
            }));
        }
    }

    /// Allocate a voice for a group, stealing if the pool is full.
    ///
    /// Returns the `(pool_index, id)` pair of the new voice. The caller
    /// binds the audio unit and initializes the state.
    pub fn new_voice(&mut self, group_id: u64) -> (usize, u64) {
        let victim = loop {
            match self.heap.pop() {
                Some(Reverse(key)) => {
                    let voice = &self.voices[key.pool_index];
                    // Skip entries that no longer describe the voice.
                    if voice.id() != key.id || rank_of(voice) != key.rank {
                        continue;
                    }
                    break key.pool_index;
                }
                None => {
                    // All entries went stale; rebuild and retry.
                    self.refresh_steal_order();
                    continue;
                }
            }
        };

        // A stolen group goes away as a whole.
        let victim_group = self.voices[victim].group_id();
        if self.voices[victim].prio() != VoicePrio::Inactive && victim_group != 0 {
            for i in 0..self.voices.len() {
                if self.voices[i].group_id() == victim_group {
                    self.reclaim(i);
                }
            }
        } else {
            self.reclaim(victim);
        }

        let id = self.next_id;
        self.next_id += 1;
        let voice = &mut self.voices[victim];
        voice.id = id;
        voice.group_id = group_id;
        voice.prio = VoicePrio::Fg;
        voice.state.init();
        self.heap.push(Reverse(StealKey {
            rank: 3,
            id,
            pool_index: victim,
        }));
        (victim, id)
    }

    fn reclaim(&mut self, index: usize) {
        let voice = &mut self.voices[index];
        if voice.prio() == VoicePrio::Inactive {
            return;
        }
        voice.reset();
        self.heap.push(Reverse(StealKey {
            rank: 0,
            id: voice.id(),
            pool_index: index,
        }));
    }

    /// Generation-checked lookup.
    pub fn get(&self, pool_index: usize, id: u64) -> Option<&Voice> {
        let voice = self.voices.get(pool_index)?;
        if voice.id() == id && voice.prio() != VoicePrio::Inactive {
            Some(voice)
        } else {
            None
        }
    }

    /// Generation-checked mutable lookup.
    pub fn get_mut(&mut self, pool_index: usize, id: u64) -> Option<&mut Voice> {
        let voice = self.voices.get_mut(pool_index)?;
        if voice.id() == id && voice.prio() != VoicePrio::Inactive {
            Some(voice)
        } else {
            None
        }
    }

    /// Return a finished voice to the free state.
    pub fn reset_voice(&mut self, pool_index: usize) {
        self.reclaim(pool_index);
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &Voice> {
        self.voices
            .iter()
            .filter(|v| v.prio() != VoicePrio::Inactive)
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices
            .iter_mut()
            .filter(|v| v.prio() != VoicePrio::Inactive)
    }

    pub fn active_count(&self) -> usize {
        self.iter_active().count()
    }

    /// The raw slot array, for the renderer.
    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Reclaim every voice.
    pub fn reset_all(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
        self.refresh_steal_order();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(size: usize) -> VoicePool {
        VoicePool::new(size, &Memory::new()).unwrap()
    }

    #[test]
    fn test_size_limits() {
        let memory = Memory::new();
        assert!(VoicePool::new(1, &memory).is_err());
        assert!(VoicePool::new(crate::limits::VOICES_MAX + 1, &memory).is_err());
        assert!(VoicePool::new(2, &memory).is_ok());
    }

    #[test]
    fn test_allocation_prefers_free_slots() {
        let mut pool = pool(4);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..4 {
            let group = pool.new_group_id();
            let (index, _) = pool.new_voice(group);
            assert!(seen.insert(index), "allocated an occupied slot");
        }
    }

    #[test]
    fn test_steal_takes_oldest_lowest_priority() {
        let mut pool = pool(4);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let group = pool.new_group_id();
            handles.push(pool.new_voice(group));
        }
        // Push one voice to the background; it becomes the steal target
        // even though it is not the oldest.
        let (bg_index, bg_id) = handles[2];
        pool.get_mut(bg_index, bg_id).unwrap().to_background();
        pool.refresh_steal_order();

        let group = pool.new_group_id();
        let (stolen_index, new_id) = pool.new_voice(group);
        assert_eq!(stolen_index, bg_index);
        assert!(new_id > bg_id);
        // The old handle is dead.
        assert!(pool.get(bg_index, bg_id).is_none());
        assert!(pool.get(stolen_index, new_id).is_some());
    }

    #[test]
    fn test_steal_with_all_foreground_takes_oldest() {
        let mut pool = pool(3);
        let mut handles = Vec::new();
        for _ in 0..3 {
            let group = pool.new_group_id();
            handles.push(pool.new_voice(group));
        }
        let group = pool.new_group_id();
        let (stolen_index, _) = pool.new_voice(group);
        assert_eq!(stolen_index, handles[0].0);
        assert!(pool.get(handles[0].0, handles[0].1).is_none());
    }

    #[test]
    fn test_group_is_stolen_together() {
        let mut pool = pool(4);
        let group_a = pool.new_group_id();
        let a1 = pool.new_voice(group_a);
        let a2 = pool.new_voice(group_a);
        let group_b = pool.new_group_id();
        let b1 = pool.new_voice(group_b);
        let b2 = pool.new_voice(group_b);

        // Pool is full; the next note steals group A entirely.
        let group_c = pool.new_group_id();
        let (c_index, _) = pool.new_voice(group_c);
        assert!(pool.get(a1.0, a1.1).is_none());
        assert!(pool.get(a2.0, a2.1).is_none());
        assert!(pool.get(b1.0, b1.1).is_some());
        assert!(pool.get(b2.0, b2.1).is_some());
        assert!(a1.0 == c_index || a2.0 == c_index);
        // One of the two reclaimed A slots is free again.
        assert_eq!(pool.active_count(), 3);
    }

    #[test]
    fn test_near_silent_bg_steals_before_loud_bg() {
        let mut pool = pool(2);
        let g1 = pool.new_group_id();
        let (loud_index, loud_id) = pool.new_voice(g1);
        let g2 = pool.new_group_id();
        let (quiet_index, quiet_id) = pool.new_voice(g2);

        {
            let loud = pool.get_mut(loud_index, loud_id).unwrap();
            loud.to_background();
            loud.state.last_peak = 0.8;
        }
        {
            let quiet = pool.get_mut(quiet_index, quiet_id).unwrap();
            quiet.to_background();
            quiet.state.last_peak = 1e-5;
        }
        pool.refresh_steal_order();

        // The quiet voice is younger but steals first.
        assert!(quiet_id > loud_id);
        let g3 = pool.new_group_id();
        let (stolen, _) = pool.new_voice(g3);
        assert_eq!(stolen, quiet_index);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut pool = pool(2);
        let mut last = 0;
        for _ in 0..10 {
            let group = pool.new_group_id();
            let (_, id) = pool.new_voice(group);
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn test_set_size_reclaims_everything() {
        let mut pool = pool(4);
        let group = pool.new_group_id();
        let (index, id) = pool.new_voice(group);
        pool.set_size(8, &Memory::new()).unwrap();
        assert_eq!(pool.size(), 8);
        assert!(pool.get(index, id).is_none());
        assert_eq!(pool.active_count(), 0);
    }
}
