//! Fork/join helper for parallel voice rendering.
//!
//! Voice states are disjoint per voice, so slices of the voice pool can
//! render concurrently as long as each worker has its own work buffers
//! and accumulation area. The only synchronization is the join: no shared
//! mutable state crosses it without the scope's happens-before edge.

use crossbeam_channel::unbounded;
use parking_lot::Mutex;

/// A unit of work handed to the pool.
pub type Job<'a> = Box<dyn FnOnce() + Send + 'a>;

/// Run jobs on up to `thread_count` scoped workers and join.
///
/// With one thread (or one job) everything runs inline on the caller.
/// A panicking job poisons nothing: the panic is captured, the remaining
/// jobs still run, and the first panic is resumed on the caller after the
/// join.
pub fn fork_join(thread_count: usize, jobs: Vec<Job<'_>>) {
    if thread_count <= 1 || jobs.len() <= 1 {
        for job in jobs {
            job();
        }
        return;
    }

    let worker_count = thread_count.min(jobs.len());
    let panics: Mutex<Vec<Box<dyn std::any::Any + Send>>> = Mutex::new(Vec::new());
    let (tx, rx) = unbounded::<Job<'_>>();
    for job in jobs {
        tx.send(job).expect("queue is open");
    }
    drop(tx);

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let rx = rx.clone();
            let panics = &panics;
            scope.spawn(move || {
                while let Ok(job) = rx.recv() {
                    if let Err(payload) =
                        std::panic::catch_unwind(std::panic::AssertUnwindSafe(job))
                    {
                        panics.lock().push(payload);
                    }
                }
            });
        }
    });

    if let Some(payload) = panics.into_inner().into_iter().next() {
        std::panic::resume_unwind(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_all_jobs_run() {
        let counter = AtomicUsize::new(0);
        let jobs: Vec<Job<'_>> = (0..32)
            .map(|_| {
                let counter = &counter;
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }) as Job<'_>
            })
            .collect();
        fork_join(4, jobs);
        assert_eq!(counter.load(Ordering::SeqCst), 32);
    }

    #[test]
    fn test_single_thread_runs_inline() {
        let mut touched = false;
        {
            let jobs: Vec<Job<'_>> = vec![Box::new(|| {})];
            fork_join(1, jobs);
            touched = true;
        }
        assert!(touched);
    }

    #[test]
    fn test_disjoint_slices_are_written() {
        let mut data = vec![0u32; 64];
        let chunks: Vec<&mut [u32]> = data.chunks_mut(16).collect();
        let jobs: Vec<Job<'_>> = chunks
            .into_iter()
            .enumerate()
            .map(|(n, chunk)| {
                Box::new(move || {
                    for slot in chunk {
                        *slot = n as u32 + 1;
                    }
                }) as Job<'_>
            })
            .collect();
        fork_join(4, jobs);
        assert_eq!(data[0], 1);
        assert_eq!(data[16], 2);
        assert_eq!(data[63], 4);
    }

    #[test]
    #[should_panic(expected = "worker boom")]
    fn test_panic_is_propagated() {
        crate::memory::suppress_assert_messages();
        let jobs: Vec<Job<'_>> = vec![
            Box::new(|| panic!("worker boom")),
            Box::new(|| {}),
        ];
        fork_join(2, jobs);
    }
}
