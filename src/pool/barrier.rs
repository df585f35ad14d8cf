// Copyright (c) 2024, BlockProject 3D
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without modification,
// are permitted provided that the following conditions are met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//     * Redistributions in binary form must reproduce the above copyright notice,
//       this list of conditions and the following disclaimer in the documentation
//       and/or other materials provided with the distribution.
//     * Neither the name of BlockProject 3D nor the names of its contributors
//       may be used to endorse or promote products derived from this software
//       without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT OWNER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::sync::{Condvar, Mutex};

struct State {
    threshold: usize,
    count: usize,
    generation: u64,
}

/// A generational phase barrier: `threshold` calls to [`Barrier::wait`] (or its
/// predicate variant) are required to release all waiters, after which the
/// barrier immediately resets for its next generation.
///
/// `wait_until_condition` is the escape hatch the pool uses for shutdown: a
/// worker blocked in the barrier wakes either because the cohort completed
/// (normal generation bump) or because the predicate became true (pool
/// closing), and must check which case occurred.
pub struct Barrier {
    state: Mutex<State>,
    cv: Condvar,
}

impl Barrier {
    pub fn new(threshold: usize) -> Self {
        Barrier {
            state: Mutex::new(State {
                threshold,
                count: threshold,
                generation: 0,
            }),
            cv: Condvar::new(),
        }
    }

    /// Plain wait: blocks until `threshold` callers have arrived.
    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap();
        let gen = state.generation;
        state.count -= 1;
        if state.count == 0 {
            state.generation += 1;
            state.count = state.threshold;
            self.cv.notify_all();
        } else {
            let _guard = self
                .cv
                .wait_while(state, |s| s.generation == gen)
                .unwrap();
        }
    }

    /// Waits until `threshold` callers have arrived, or `pred` becomes true.
    /// Returns `true` if released by the cohort completing (the normal path),
    /// `false` if released by the predicate (the pool is closing).
    pub fn wait_until_condition(&self, pred: impl Fn() -> bool) -> bool {
        let mut state = self.state.lock().unwrap();
        let gen = state.generation;
        state.count -= 1;
        if state.count == 0 {
            state.generation += 1;
            state.count = state.threshold;
            self.cv.notify_all();
            true
        } else {
            let mut guard = self
                .cv
                .wait_while(state, |s| s.generation == gen && !pred())
                .unwrap();
            if guard.generation != gen {
                true
            } else {
                // We woke on the predicate, not the generation bump: give back
                // the slot we took so a genuine cohort completion still works.
                guard.count += 1;
                false
            }
        }
    }

    /// Wakes every waiter without advancing the generation, so each can
    /// re-check its predicate (used to broadcast a close request).
    pub fn notify_all(&self) {
        self.cv.notify_all();
    }
}
