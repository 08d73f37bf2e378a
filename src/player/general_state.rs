//! Conditional event execution.
//!
//! `?` stores an evaluated condition; `?if`/`?else`/`?end` open, flip and
//! close gating scopes. While a scope is gated off, non-structural events
//! are ignored but the structural ones still maintain the nesting. Depth
//! is bounded; a `?if` past the bound is rejected like a malformed
//! argument.

use crate::limits::COND_LEVELS_MAX;
use arrayvec::ArrayVec;

#[derive(Debug, Clone, Copy)]
struct CondFrame {
    /// Condition value captured when the scope opened.
    cond_value: bool,
    /// Whether we are in the `?else` branch.
    in_else: bool,
    /// Whether the surrounding scope allowed events.
    parent_enabled: bool,
}

impl CondFrame {
    fn branch_enabled(&self) -> bool {
        self.parent_enabled && (self.cond_value != self.in_else)
    }
}

/// Conditional execution state shared by a dispatch scope.
#[derive(Debug, Clone, Default)]
pub struct GeneralState {
    evaluated_cond: bool,
    stack: ArrayVec<CondFrame, COND_LEVELS_MAX>,
}

impl GeneralState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether non-structural events currently take effect.
    pub fn events_enabled(&self) -> bool {
        match self.stack.last() {
            Some(frame) => frame.branch_enabled(),
            None => true,
        }
    }

    /// Store the result of a condition evaluation.
    pub fn set_cond(&mut self, value: bool) {
        self.evaluated_cond = value;
    }

    pub fn evaluated_cond(&self) -> bool {
        self.evaluated_cond
    }

    /// Open an `?if` scope. Fails when the nesting bound is hit.
    pub fn begin_if(&mut self) -> bool {
        let frame = CondFrame {
            cond_value: self.evaluated_cond,
            in_else: false,
            parent_enabled: self.events_enabled(),
        };
        self.stack.try_push(frame).is_ok()
    }

    /// Flip the innermost scope to its `?else` branch.
    pub fn begin_else(&mut self) -> bool {
        match self.stack.last_mut() {
            Some(frame) if !frame.in_else => {
                frame.in_else = true;
                true
            }
            _ => false,
        }
    }

    /// Close the innermost scope.
    pub fn end_if(&mut self) -> bool {
        self.stack.pop().is_some()
    }

    pub fn reset(&mut self) {
        self.evaluated_cond = false;
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_scope_enables_events() {
        let state = GeneralState::new();
        assert!(state.events_enabled());
    }

    #[test]
    fn test_if_gates_on_condition() {
        let mut state = GeneralState::new();
        state.set_cond(false);
        assert!(state.begin_if());
        assert!(!state.events_enabled());
        assert!(state.begin_else());
        assert!(state.events_enabled());
        assert!(state.end_if());
        assert!(state.events_enabled());
    }

    #[test]
    fn test_nested_scopes_inherit_gating() {
        let mut state = GeneralState::new();
        state.set_cond(false);
        state.begin_if();
        // Inside a gated-off scope, even a true condition stays off.
        state.set_cond(true);
        state.begin_if();
        assert!(!state.events_enabled());
        // And its else branch stays off too.
        state.begin_else();
        assert!(!state.events_enabled());
        state.end_if();
        state.end_if();
        assert!(state.events_enabled());
    }

    #[test]
    fn test_double_else_is_rejected() {
        let mut state = GeneralState::new();
        state.set_cond(true);
        state.begin_if();
        assert!(state.begin_else());
        assert!(!state.begin_else());
    }

    #[test]
    fn test_end_without_if_is_rejected() {
        let mut state = GeneralState::new();
        assert!(!state.end_if());
    }

    #[test]
    fn test_nesting_bound() {
        let mut state = GeneralState::new();
        state.set_cond(true);
        for _ in 0..COND_LEVELS_MAX {
            assert!(state.begin_if());
        }
        assert!(!state.begin_if());
    }
}
