//! The per-voice event queue.
//!
//! Channel events that land inside a rendered chunk are queued onto the
//! owning voice with their frame position; the voice drains them in order
//! while rendering. The queue is a small fixed-capacity ring; insertion
//! keeps it sorted by position (insertion sort, bounded by the per-tick
//! event limit).

use crate::events::{EventType, Value};

/// One queued voice event.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceEvent {
    pub pos: u32,
    pub event: EventType,
    pub argument: Value,
}

/// A bounded ring of voice events ordered by frame position.
#[derive(Debug, Clone)]
pub struct EventQueue {
    queue: Vec<Option<VoiceEvent>>,
    start: usize,
    count: usize,
}

impl EventQueue {
    pub fn new(size: usize) -> Self {
        assert!(size > 0);
        Self {
            queue: vec![None; size],
            start: 0,
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.queue.len()
    }

    /// Insert an event at its sorted position.
    ///
    /// Returns `false` when the queue is full; the event is then dropped by
    /// the caller.
    pub fn ins(&mut self, event: VoiceEvent) -> bool {
        if self.is_full() {
            return false;
        }
        let size = self.queue.len();
        let mut i = self.count;
        while i > 0 {
            let prev = (self.start + i - 1) % size;
            let prev_pos = self.queue[prev]
                .as_ref()
                .expect("occupied slot below count")
                .pos;
            if prev_pos <= event.pos {
                break;
            }
            let shifted = self.queue[prev].take();
            self.queue[(self.start + i) % size] = shifted;
            i -= 1;
        }
        self.queue[(self.start + i) % size] = Some(event);
        self.count += 1;
        true
    }

    /// Dequeue the earliest event.
    pub fn get(&mut self) -> Option<VoiceEvent> {
        if self.count == 0 {
            return None;
        }
        let event = self.queue[self.start].take();
        self.start = (self.start + 1) % self.queue.len();
        self.count -= 1;
        event
    }

    /// Look at the event at `index` positions from the front.
    pub fn peek(&self, index: usize) -> Option<&VoiceEvent> {
        if index >= self.count {
            return None;
        }
        self.queue[(self.start + index) % self.queue.len()].as_ref()
    }

    pub fn clear(&mut self) {
        for slot in &mut self.queue {
            *slot = None;
        }
        self.start = 0;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(pos: u32) -> VoiceEvent {
        VoiceEvent {
            pos,
            event: EventType::NoteOff,
            argument: Value::None,
        }
    }

    #[test]
    fn test_events_come_out_sorted() {
        let mut queue = EventQueue::new(8);
        for pos in [5, 1, 9, 3] {
            assert!(queue.ins(ev(pos)));
        }
        let order: Vec<u32> = std::iter::from_fn(|| queue.get()).map(|e| e.pos).collect();
        assert_eq!(order, vec![1, 3, 5, 9]);
    }

    #[test]
    fn test_equal_positions_keep_insertion_order() {
        let mut queue = EventQueue::new(4);
        let mut a = ev(2);
        a.event = EventType::SetForce;
        a.argument = Value::Float(1.0);
        queue.ins(a);
        queue.ins(ev(2));
        assert_eq!(queue.get().unwrap().event, EventType::SetForce);
        assert_eq!(queue.get().unwrap().event, EventType::NoteOff);
    }

    #[test]
    fn test_full_queue_rejects() {
        let mut queue = EventQueue::new(2);
        assert!(queue.ins(ev(0)));
        assert!(queue.ins(ev(1)));
        assert!(!queue.ins(ev(2)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_get_from_empty_fails_cleanly() {
        let mut queue = EventQueue::new(2);
        assert!(queue.get().is_none());
        queue.ins(ev(0));
        queue.get();
        assert!(queue.get().is_none());
    }

    #[test]
    fn test_ring_wraps_across_clear_boundary() {
        let mut queue = EventQueue::new(3);
        queue.ins(ev(1));
        queue.ins(ev(2));
        queue.get();
        queue.ins(ev(0));
        queue.ins(ev(3));
        let order: Vec<u32> = std::iter::from_fn(|| queue.get()).map(|e| e.pos).collect();
        assert_eq!(order, vec![0, 2, 3]);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut queue = EventQueue::new(4);
        queue.ins(ev(7));
        assert_eq!(queue.peek(0).unwrap().pos, 7);
        assert_eq!(queue.peek(1), None);
        assert_eq!(queue.len(), 1);
    }
}
