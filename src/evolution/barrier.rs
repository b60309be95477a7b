//! # GenerationBarrier
//!
//! Synchronizes the invoking thread with the mating workers once per
//! generation. The invoking thread opens a round with
//! [`start_round`](GenerationBarrier::start_round); every participant, the
//! invoking thread included, mates its range and calls
//! [`arrive_and_wait`](GenerationBarrier::arrive_and_wait), which returns once
//! all of them have arrived. Workers then block in
//! [`wait_for_start`](GenerationBarrier::wait_for_start) until the next round
//! opens or the barrier is shut down.
//!
//! A round counter distinguishes consecutive rounds, so a participant that is
//! slow to wake up never mistakes the next round's state for its own.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// What a waiting worker should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Mate the assigned range for the round that just opened.
    Mate,
    /// Leave the worker loop.
    Terminate,
}

#[derive(Debug)]
struct BarrierState {
    participants: usize,
    go: bool,
    terminate: bool,
    finished: usize,
    round: u64,
}

#[derive(Debug)]
pub struct GenerationBarrier {
    state: Mutex<BarrierState>,
    start: Condvar,
    all_finished: Condvar,
}

impl GenerationBarrier {
    /// Creates a barrier for the invoking thread plus `workers` workers.
    pub fn new(workers: usize) -> Self {
        Self {
            state: Mutex::new(BarrierState {
                participants: workers + 1,
                go: false,
                terminate: false,
                finished: 0,
                round: 0,
            }),
            start: Condvar::new(),
            all_finished: Condvar::new(),
        }
    }

    /// Number of threads a round waits for, the invoking thread included.
    pub fn participants(&self) -> usize {
        self.lock().participants
    }

    /// Registers one more worker. Only valid before the first round opens.
    pub fn add_participant(&self) {
        self.lock().participants += 1;
    }

    /// Opens a round and wakes the waiting workers.
    pub fn start_round(&self) {
        let mut state = self.lock();
        state.go = true;
        self.start.notify_all();
    }

    /// Blocks until a round opens or the barrier shuts down.
    pub fn wait_for_start(&self) -> Signal {
        let state = self
            .start
            .wait_while(self.lock(), |state| !state.go)
            .unwrap_or_else(PoisonError::into_inner);
        if state.terminate {
            Signal::Terminate
        } else {
            Signal::Mate
        }
    }

    /// Marks the caller's range as done and blocks until every participant
    /// has done the same, or the barrier shuts down.
    ///
    /// The last participant to arrive closes the round.
    pub fn arrive_and_wait(&self) {
        let mut state = self.lock();
        let round = state.round;
        state.finished += 1;
        if state.finished == state.participants {
            state.finished = 0;
            state.go = false;
            state.round += 1;
            self.all_finished.notify_all();
        } else {
            let _state = self
                .all_finished
                .wait_while(state, |state| state.round == round && !state.terminate)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Releases every waiting worker with [`Signal::Terminate`].
    pub fn signal_shutdown(&self) {
        let mut state = self.lock();
        state.terminate = true;
        state.go = true;
        self.start.notify_all();
        self.all_finished.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shuts the barrier down when dropped, so workers are released even if the
/// invoking thread unwinds.
pub(crate) struct ShutdownGuard<'a>(pub(crate) &'a GenerationBarrier);

impl Drop for ShutdownGuard<'_> {
    fn drop(&mut self) {
        self.0.signal_shutdown();
    }
}
