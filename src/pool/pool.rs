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

//! Cooperative multi-worker executor. Workers advance through the task queue
//! in lock-step rounds: an entry barrier agrees whether a task is available,
//! a mutex-protected cursor hands out its Problems one at a time, and an exit
//! barrier confirms every dispatched Problem has returned before the task is
//! retired and the next one begins.

use crate::image::Image;
use crate::pool::barrier::Barrier;
use crate::pool::problem::{Problem, ProblemSpace};
use crate::pool::semaphore::Semaphore;
use crate::pool::task::{Task, TaskHandle};
use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// How often idle workers re-check for shutdown while no task is queued.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Inner<P> {
    // Lock-free MPMC FIFO, same as the teacher's pipeline dispatch queue
    // (`crossbeam::queue::ArrayQueue` in `compiler/src/pipeline.rs`), sized
    // unbounded here since Tasks (not per-pixel work) are what's queued.
    queue: SegQueue<Task<P>>,
    // The task currently being dispatched, shared (never mutated) by every
    // worker for the duration of its cohort round. Wrapped in `Arc` so a
    // worker can clone it out and call `run_problem` without holding this
    // lock for the task's full execution time.
    current: Mutex<Option<std::sync::Arc<Task<P>>>>,
    cursor: Mutex<Option<Problem>>,
    sem: Semaphore,
    barrier: Barrier,
    closing: AtomicBool,
}

/// A fixed-size worker team draining a FIFO queue of [`Task`]s.
///
/// Workers are spawned lazily on the first [`ThreadPool::enqueue_task`] and
/// persist until [`ThreadPool::wait`] (or `Drop`) cooperatively joins them.
pub struct ThreadPool<P> {
    inner: std::sync::Arc<Inner<P>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    n_threads: usize,
}

impl<P: Send + 'static> ThreadPool<P> {
    /// `n_threads = None` uses `std::thread::available_parallelism`.
    pub fn new(n_threads: Option<usize>) -> Self {
        let n_threads = n_threads
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
            .max(1);
        ThreadPool {
            inner: std::sync::Arc::new(Inner {
                queue: SegQueue::new(),
                current: Mutex::new(None),
                cursor: Mutex::new(None),
                sem: Semaphore::new(0),
                barrier: Barrier::new(n_threads),
                closing: AtomicBool::new(false),
            }),
            workers: Mutex::new(Vec::new()),
            n_threads,
        }
    }

    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    fn ensure_workers_started(&self) {
        let mut workers = self.workers.lock().unwrap();
        if workers.is_empty() {
            info!(n_threads = self.n_threads, "starting thread pool workers");
            for id in 0..self.n_threads {
                let inner = self.inner.clone();
                workers.push(
                    std::thread::Builder::new()
                        .name(format!("raytracer-worker-{id}"))
                        .spawn(move || worker_loop(inner))
                        .expect("failed to spawn worker thread"),
                );
            }
        }
    }

    /// Enqueues a Task that writes one image row per Problem. `row_axis`
    /// selects which `Problem` axis indexes the row (`render::render` uses 0).
    /// Returns a [`TaskHandle`] for cancellation, status, and blocking retrieval
    /// of the result image.
    ///
    /// Start/complete callbacks are attached via `Task`'s builder methods
    /// before calling [`ThreadPool::enqueue`], rather than as setters on the
    /// returned handle: once the Task is queued it may be picked up by a
    /// worker at any instant, so there is no race-free later point at which a
    /// setter on the handle could still guarantee "before the first Problem".
    #[instrument(skip(self, image, per_row))]
    pub fn enqueue_task(
        &self,
        image: Image<P>,
        problem_space: ProblemSpace,
        row_axis: usize,
        per_row: impl Fn(&mut [P], Problem, &AtomicBool) + Send + Sync + 'static,
    ) -> TaskHandle<P> {
        let (task, handle) = Task::new(image, problem_space, row_axis, per_row);
        self.enqueue(task);
        handle
    }

    /// Enqueues a fully-built [`Task`] (with any callbacks already attached).
    pub fn enqueue(&self, task: Task<P>) {
        self.ensure_workers_started();
        self.inner.queue.push(task);
        self.inner.sem.notify();
    }

    /// Cooperatively closes the pool: blocks until every queued and in-flight
    /// Task has drained (each one still runs to completion and fires its own
    /// Start/Per-Problem/Complete callbacks normally), then sets the shutdown
    /// flag and joins every worker thread. The pool cannot be reused afterwards.
    ///
    /// Only once the queue is observed empty with no cohort in flight is the
    /// shutdown flag raised: raising it any earlier could strand a Task that a
    /// worker already called `begin()` on but had not yet finished dispatching,
    /// leaving its `TaskHandle::wait()` blocked forever.
    pub fn wait(&self) {
        drain_then_shutdown(&self.inner, &self.workers);
    }
}

impl<P> Drop for ThreadPool<P> {
    fn drop(&mut self) {
        drain_then_shutdown(&self.inner, &self.workers);
    }
}

/// Blocks until the task queue and the current cohort slot are both empty,
/// then raises the shutdown flag and joins every worker. Shared between
/// `ThreadPool::wait` and `Drop` so neither path can strand a Task that a
/// worker already called `begin()` on: raising `closing` any earlier could
/// release a worker out of the entry barrier before it dispatches the
/// cohort it just claimed, leaving that Task's `TaskHandle::wait()` blocked
/// forever.
fn drain_then_shutdown<P>(inner: &std::sync::Arc<Inner<P>>, workers: &Mutex<Vec<JoinHandle<()>>>) {
    loop {
        let idle = inner.queue.is_empty() && inner.current.lock().unwrap().is_none();
        if idle {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    inner.closing.store(true, Ordering::Release);
    inner.barrier.notify_all();
    let mut workers = workers.lock().unwrap();
    for handle in workers.drain(..) {
        let _ = handle.join();
    }
}

fn worker_loop<P: Send + 'static>(inner: std::sync::Arc<Inner<P>>) {
    loop {
        try_start_next_task(&inner);

        let entered = inner
            .barrier
            .wait_until_condition(|| inner.closing.load(Ordering::Acquire));
        if !entered {
            break;
        }

        let has_task = inner.current.lock().unwrap().is_some();
        if !has_task {
            if inner.closing.load(Ordering::Acquire) {
                break;
            }
            inner.sem.wait_for(POLL_INTERVAL);
            continue;
        }

        dispatch_until_drained(&inner);

        inner.barrier.wait();
        retire_if_owner(&inner);
    }
}

fn try_start_next_task<P: Send + 'static>(inner: &Inner<P>) {
    let mut current = inner.current.lock().unwrap();
    if current.is_none() {
        if let Some(mut task) = inner.queue.pop() {
            task.begin();
            *inner.cursor.lock().unwrap() = Some([0, 0, 0, 0]);
            *current = Some(std::sync::Arc::new(task));
        }
    }
}

/// Pulls the next Problem for the current task, if any remain. Only holds
/// `current` long enough to clone the `Arc`, so `run_problem` itself executes
/// with no pool lock held.
fn claim_next_problem<P: Send + 'static>(inner: &Inner<P>) -> Option<(std::sync::Arc<Task<P>>, Problem)> {
    let task = inner.current.lock().unwrap().as_ref()?.clone();
    let mut cursor = inner.cursor.lock().unwrap();
    if task.is_cancelled() {
        *cursor = None;
    }
    let p = cursor.take()?;
    let mut next = p;
    *cursor = if task.space().advance(&mut next) {
        Some(next)
    } else {
        None
    };
    drop(cursor);
    Some((task, p))
}

fn dispatch_until_drained<P: Send + 'static>(inner: &Inner<P>) {
    while let Some((task, p)) = claim_next_problem(inner) {
        task.run_problem(p);
    }
}

fn retire_if_owner<P: Send + 'static>(inner: &Inner<P>) {
    let mut current = inner.current.lock().unwrap();
    if let Some(task_arc) = current.take() {
        match std::sync::Arc::try_unwrap(task_arc) {
            Ok(task) => {
                if task.remaining() != 0 {
                    warn!(
                        remaining = task.remaining(),
                        "retiring task with unprocessed problems; this indicates a pool bug"
                    );
                }
                task.finish();
            }
            Err(_) => {
                warn!("task still referenced after exit barrier; skipping retirement this round");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::ColourRgb;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn one_row_task_runs_each_problem_exactly_once_in_order() {
        let pool: ThreadPool<i32> = ThreadPool::new(Some(2));
        let image = Image::new(1, 4).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        let order2 = order.clone();

        let handle = pool.enqueue_task(
            image,
            ProblemSpace::new([1, 1, 1, 4]),
            3,
            move |row, p, _| {
                row[0] = p[3] as i32;
                order2.lock().unwrap().push(p[3]);
            },
        );

        let image = handle.wait();
        for i in 0..4u32 {
            assert_eq!(image.row(i as usize)[0], i as i32);
        }
        let mut got = order.lock().unwrap().clone();
        got.sort_unstable();
        assert_eq!(got, vec![0, 1, 2, 3]);
        pool.wait();
    }

    #[test]
    fn start_and_complete_callbacks_each_fire_exactly_once() {
        let pool: ThreadPool<u8> = ThreadPool::new(Some(3));
        let image = Image::new(1, 16).unwrap();
        let starts = Arc::new(AtomicUsize::new(0));
        let completes = Arc::new(AtomicUsize::new(0));
        let (s1, s2) = (starts.clone(), completes.clone());
        let (task, handle) = Task::new(image, ProblemSpace::linear(16), 0, |_, _, _| {})
            .on_start(move || {
                s1.fetch_add(1, Ordering::SeqCst);
            })
            .on_complete(move |success| {
                assert!(success);
                s2.fetch_add(1, Ordering::SeqCst);
            });
        pool.enqueue(task);
        handle.wait();
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(completes.load(Ordering::SeqCst), 1);
        pool.wait();
    }

    #[test]
    fn cancellation_stops_dispatch_well_before_full_cohort() {
        let pool: ThreadPool<ColourRgb<f32>> = ThreadPool::new(Some(4));
        let image = Image::new(1, 1000).unwrap();
        let executed = Arc::new(AtomicUsize::new(0));
        let executed2 = executed.clone();
        let handle = pool.enqueue_task(image, ProblemSpace::linear(1000), 0, move |_, _, _| {
            executed2.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
        });
        std::thread::sleep(Duration::from_millis(50));
        handle.cancel();
        handle.wait();
        // 50ms at 5ms/row with 4 workers in flight is on the order of ~40 rows;
        // generous slack keeps this robust to scheduler jitter.
        assert!(executed.load(Ordering::SeqCst) < 1000);
        pool.wait();
    }
}
