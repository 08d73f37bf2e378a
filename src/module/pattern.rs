//! Patterns, columns and triggers.
//!
//! A pattern is a timed grid: one column per channel, each holding
//! triggers sorted by row position. Trigger data is immutable once the
//! module is assembled; the player only reads it.

use crate::error::KunquatError;
use crate::events::{EventType, Value};
use crate::limits::{COLUMNS_MAX, PAT_INSTANCES_MAX, PATTERNS_MAX};
use crate::tstamp::Tstamp;

/// A scheduled event inside a pattern column.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub pos: Tstamp,
    pub event: EventType,
    pub argument: Value,
}

impl Trigger {
    pub fn new(pos: Tstamp, event: EventType, argument: Value) -> Self {
        Self {
            pos,
            event,
            argument,
        }
    }
}

/// One channel lane of a pattern.
#[derive(Debug, Clone, Default)]
pub struct Column {
    triggers: Vec<Trigger>,
}

impl Column {
    /// Append a trigger; positions must be non-decreasing.
    fn push(&mut self, trigger: Trigger) -> Result<(), KunquatError> {
        if let Some(last) = self.triggers.last() {
            if trigger.pos < last.pos {
                return Err(KunquatError::Format(
                    "trigger positions must be non-decreasing within a column".to_string(),
                ));
            }
        }
        self.triggers.push(trigger);
        Ok(())
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Index of the first trigger at or after `pos`.
    pub fn first_at_or_after(&self, pos: Tstamp) -> usize {
        self.triggers.partition_point(|t| t.pos < pos)
    }
}

/// A timed grid of triggers across channels.
#[derive(Debug, Clone)]
pub struct Pattern {
    length: Tstamp,
    columns: Vec<Column>,
}

impl Pattern {
    /// Create an empty pattern of the given length in beats.
    pub fn new(length: Tstamp) -> Self {
        Self {
            length,
            columns: vec![Column::default(); COLUMNS_MAX],
        }
    }

    pub fn length(&self) -> Tstamp {
        self.length
    }

    /// Add a trigger to a channel column.
    pub fn add_trigger(
        &mut self,
        ch: usize,
        trigger: Trigger,
    ) -> Result<(), KunquatError> {
        if ch >= COLUMNS_MAX {
            return Err(KunquatError::Format(format!(
                "channel index {} out of range",
                ch
            )));
        }
        if trigger.pos > self.length {
            return Err(KunquatError::Format(
                "trigger position past pattern end".to_string(),
            ));
        }
        if !trigger.event.arg_type().accepts(&trigger.argument) {
            // Stored anyway: malformed arguments are a dispatch-time
            // rejection, not a load-time one, so a module can carry them.
            log::debug!(
                "trigger for {} carries a {:?} argument",
                trigger.event.name(),
                trigger.argument.type_of()
            );
        }
        self.columns[ch].push(trigger)
    }

    pub fn column(&self, ch: usize) -> &Column {
        &self.columns[ch]
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

/// A reference to a pattern instance: `(pattern, instance)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatInstRef {
    pub pattern: u16,
    pub instance: u16,
}

impl PatInstRef {
    pub fn new(pattern: u16, instance: u16) -> Result<Self, KunquatError> {
        if pattern as usize >= PATTERNS_MAX {
            return Err(KunquatError::Format(format!(
                "pattern number {} out of range",
                pattern
            )));
        }
        if instance as usize >= PAT_INSTANCES_MAX {
            return Err(KunquatError::Format(format!(
                "pattern instance {} out of range",
                instance
            )));
        }
        Ok(Self { pattern, instance })
    }
}
