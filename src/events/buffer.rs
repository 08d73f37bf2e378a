//! Bounded JSON log of fired events.
//!
//! Rendering appends every dispatched event here so a caller can follow
//! playback. The buffer is byte-bounded: once fewer than
//! [`EVENT_LEN_MAX`](crate::limits::EVENT_LEN_MAX) bytes remain it flips to
//! skipping mode, where further events are counted but not stored.
//! Clearing the buffer rewinds the write position and leaves skipping mode.

use super::Value;
use crate::limits::EVENT_LEN_MAX;

/// Default buffer capacity in bytes.
pub const EVENT_BUF_SIZE_DEFAULT: usize = 16384;

/// A size-bounded, JSON-encoded event log.
#[derive(Debug)]
pub struct EventBuffer {
    entries: String,
    size: usize,
    added: u64,
    skipped: u64,
    skipping: bool,
}

impl EventBuffer {
    /// Create a buffer bounded at `size` bytes of encoded output.
    pub fn new(size: usize) -> Self {
        assert!(size > EVENT_LEN_MAX);
        Self {
            entries: String::new(),
            size,
            added: 0,
            skipped: 0,
            skipping: false,
        }
    }

    /// Append one event as `[ch, [name, value]]`.
    pub fn add(&mut self, ch: usize, name: &str, arg: &Value) {
        self.added += 1;

        if self.skipping {
            self.skipped += 1;
            return;
        }

        let mut entry = format!("[{}, [", ch);
        entry.push_str(&serde_json::to_string(name).expect("string encoding cannot fail"));
        entry.push_str(", ");
        entry.push_str(&serde_json::to_string(arg).expect("value encoding cannot fail"));
        entry.push_str("]]");

        if entry.len() > EVENT_LEN_MAX {
            log::warn!("dropping oversized event entry for {}", name);
            self.skipped += 1;
            return;
        }

        let separator = if self.entries.is_empty() { 0 } else { 2 };
        if self.entries.len() + separator + entry.len() + EVENT_LEN_MAX > self.size {
            self.skipping = true;
            self.skipped += 1;
            return;
        }

        if separator > 0 {
            self.entries.push_str(", ");
        }
        self.entries.push_str(&entry);
    }

    /// The full log as a JSON array string.
    pub fn as_json(&self) -> String {
        format!("[{}]", self.entries)
    }

    /// Whether the buffer has reached its capacity.
    pub fn is_full(&self) -> bool {
        self.skipping
    }

    /// Whether events are currently being counted instead of stored.
    pub fn is_skipping(&self) -> bool {
        self.skipping
    }

    /// Total events offered since the last clear.
    pub fn events_added(&self) -> u64 {
        self.added
    }

    /// Events dropped since the last clear.
    pub fn events_skipped(&self) -> u64 {
        self.skipped
    }

    /// Rewind the write position and leave skipping mode.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.added = 0;
        self.skipped = 0;
        self.skipping = false;
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(EVENT_BUF_SIZE_DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tstamp::Tstamp;

    #[test]
    fn test_empty_buffer_is_empty_array() {
        let buffer = EventBuffer::new(1024);
        assert_eq!(buffer.as_json(), "[]");
        assert!(!buffer.is_skipping());
    }

    #[test]
    fn test_entries_are_well_formed_json() {
        let mut buffer = EventBuffer::new(4096);
        buffer.add(0, "n+", &Value::Float(0.0));
        buffer.add(3, "/=f", &Value::Tstamp(Tstamp::new(1, 0)));
        buffer.add(1, "n-", &Value::None);
        let parsed: serde_json::Value = serde_json::from_str(&buffer.as_json()).unwrap();
        let entries = parsed.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0][0], 0);
        assert_eq!(entries[0][1][0], "n+");
        assert_eq!(entries[1][1][1], serde_json::json!([1, 0]));
        assert_eq!(entries[2][1][1], serde_json::Value::Null);
    }

    #[test]
    fn test_quote_in_name_is_escaped() {
        let mut buffer = EventBuffer::new(4096);
        buffer.add(0, "odd\"name", &Value::None);
        let parsed: serde_json::Value = serde_json::from_str(&buffer.as_json()).unwrap();
        assert_eq!(parsed[0][1][0], "odd\"name");
    }

    #[test]
    fn test_overflow_flips_to_skipping() {
        let mut buffer = EventBuffer::new(EVENT_LEN_MAX + 128);
        for _ in 0..1000 {
            buffer.add(0, "n+", &Value::Float(0.0));
        }
        assert!(buffer.is_full());
        assert!(buffer.is_skipping());
        assert!(buffer.events_added() > buffer.events_skipped());
        assert!(buffer.events_skipped() > 0);
        // The stored prefix stays valid JSON.
        let parsed: serde_json::Value = serde_json::from_str(&buffer.as_json()).unwrap();
        assert!(parsed.is_array());
    }

    #[test]
    fn test_clear_resets_skipping() {
        let mut buffer = EventBuffer::new(EVENT_LEN_MAX + 128);
        for _ in 0..100 {
            buffer.add(0, "n+", &Value::Float(0.0));
        }
        assert!(buffer.is_skipping());
        buffer.clear();
        assert!(!buffer.is_skipping());
        assert_eq!(buffer.events_added(), 0);
        assert_eq!(buffer.as_json(), "[]");
        buffer.add(0, "n-", &Value::None);
        assert_eq!(buffer.events_added(), 1);
        assert_eq!(buffer.events_skipped(), 0);
    }

    #[test]
    fn test_buffer_never_exceeds_size() {
        let size = 2048;
        let mut buffer = EventBuffer::new(size);
        for i in 0..5000 {
            buffer.add(i % 64, "cf", &Value::Float(i as f64 * 0.001));
        }
        assert!(buffer.as_json().len() <= size);
    }
}
