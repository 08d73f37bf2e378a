//! Allocation accounting with simulated failures.
//!
//! The render loop never allocates; all buffers are claimed at setup time
//! through an engine-scoped [`Memory`] accountant. Tests can schedule a
//! simulated out-of-memory failure after a given number of successful
//! claims to exercise the degradation paths (dropped notes, rejected
//! reconfiguration).
//!
//! Assertion messages from debug builds can be silenced with
//! [`suppress_assert_messages`] for tests that expect a panic.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

/// Engine-scoped allocation accountant.
///
/// Each playback handle owns one; handles stay fully independent.
#[derive(Debug)]
pub struct Memory {
    out_of_memory_steps: Cell<i64>,
    alloc_count: Cell<i64>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            out_of_memory_steps: Cell::new(-1),
            alloc_count: Cell::new(0),
        }
    }

    /// Claim one allocation.
    ///
    /// Returns `false` when a simulated failure fires; the caller must then
    /// degrade instead of allocating.
    pub fn claim(&self) -> bool {
        let steps = self.out_of_memory_steps.get();
        if steps == 0 {
            self.out_of_memory_steps.set(-1);
            return false;
        }
        if steps > 0 {
            self.out_of_memory_steps.set(steps - 1);
        }
        self.alloc_count.set(self.alloc_count.get() + 1);
        true
    }

    /// Claim `count` allocations as one unit; fails atomically.
    pub fn claim_many(&self, count: usize) -> bool {
        let steps = self.out_of_memory_steps.get();
        if steps >= 0 && (steps as usize) < count {
            self.out_of_memory_steps.set(-1);
            return false;
        }
        if steps > 0 {
            self.out_of_memory_steps.set(steps - count as i64);
        }
        self.alloc_count.set(self.alloc_count.get() + count as i64);
        true
    }

    /// Simulate an allocation failure after `steps` successful claims.
    ///
    /// A negative value disables the simulation.
    pub fn fake_out_of_memory(&self, steps: i64) {
        self.out_of_memory_steps.set(steps);
    }

    /// Total number of successful claims made so far.
    pub fn alloc_count(&self) -> i64 {
        self.alloc_count.get()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

static ASSERTS_SUPPRESSED: AtomicBool = AtomicBool::new(false);
static HOOK_INSTALL: Once = Once::new();

/// Suppress panic message printing for assertion failures.
///
/// Useful in tests that expect a panic and do not want its backtrace noise
/// in the output. The suppression is process-wide and cannot be undone.
pub fn suppress_assert_messages() {
    ASSERTS_SUPPRESSED.store(true, Ordering::SeqCst);
    HOOK_INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if !ASSERTS_SUPPRESSED.load(Ordering::SeqCst) {
                previous(info);
            }
        }));
    });
}
