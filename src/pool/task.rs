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

//! A dispatched unit of work: a [`ProblemSpace`] to enumerate against one row
//! of a result `Image`, with lifecycle callbacks and cooperative cancellation.
//!
//! The Problem function receives only the row slice for its Problem, not the
//! whole `Image`: every Problem this crate ever dispatches is exactly one
//! image row (see `render::render`), so confining the unsafe disjoint-row
//! splitting to [`ImageCell`] keeps the rest of the crate free of unsafe.

use crate::image::Image;
use crate::pool::problem::{Problem, ProblemSpace};
use std::any::Any;
use std::cell::UnsafeCell;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use tracing::{debug, warn};

/// Where a [`Task`] currently stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Started,
    Completed,
    /// Cancel requested before completion, or a worker panicked mid-Problem.
    Cancelled,
}

/// Interior-mutable wrapper letting disjoint rows of an `Image` be written
/// from different worker threads through a shared reference. Safety rests
/// entirely on the pool's invariant that no two workers are ever handed the
/// same row index for one Task.
struct ImageCell<P>(UnsafeCell<Image<P>>);

unsafe impl<P: Send> Sync for ImageCell<P> {}

impl<P> ImageCell<P> {
    fn new(image: Image<P>) -> Self {
        ImageCell(UnsafeCell::new(image))
    }

    /// # Safety
    /// Caller must not call this with the same `row` concurrently from two
    /// threads for the lifetime of the returned slice.
    unsafe fn row_mut(&self, row: usize) -> &mut [P] {
        (*self.0.get()).row_mut(row)
    }

    fn into_inner(self) -> Image<P> {
        self.0.into_inner()
    }
}

struct Shared {
    status: Mutex<TaskStatus>,
    cv: Condvar,
    cancelled: AtomicBool,
    remaining: AtomicUsize,
    panic: Mutex<Option<Box<dyn Any + Send>>>,
}

/// A unit of work dispatched to the pool: one Problem per image row, routed
/// through `per_row` with the cancel flag so long-running rows can observe a
/// cancellation request (though the spec's contract is cooperative between
/// Problems, not mid-Problem).
pub struct Task<P> {
    image: Arc<ImageCell<P>>,
    space: ProblemSpace,
    row_axis: usize,
    per_row: Arc<dyn Fn(&mut [P], Problem, &AtomicBool) + Send + Sync>,
    on_start: Option<Box<dyn FnOnce() + Send>>,
    on_problem: Option<Arc<dyn Fn(Problem) + Send + Sync>>,
    on_complete: Option<Box<dyn FnOnce(bool) + Send>>,
    shared: Arc<Shared>,
}

/// A cooperative handle to a dispatched [`Task`]: status, cancellation, and
/// blocking retrieval of the finished `Image`.
pub struct TaskHandle<P> {
    image: Arc<ImageCell<P>>,
    shared: Arc<Shared>,
}

impl<P> Clone for TaskHandle<P> {
    fn clone(&self) -> Self {
        TaskHandle {
            image: self.image.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<P: Send + 'static> Task<P> {
    /// `row_axis` selects which of the four `Problem` axes indexes the image
    /// row; `render::render` uses axis 0.
    pub fn new(
        image: Image<P>,
        space: ProblemSpace,
        row_axis: usize,
        per_row: impl Fn(&mut [P], Problem, &AtomicBool) + Send + Sync + 'static,
    ) -> (Task<P>, TaskHandle<P>) {
        let image = Arc::new(ImageCell::new(image));
        let shared = Arc::new(Shared {
            status: Mutex::new(TaskStatus::Pending),
            cv: Condvar::new(),
            cancelled: AtomicBool::new(false),
            remaining: AtomicUsize::new(space.len() as usize),
            panic: Mutex::new(None),
        });
        let task = Task {
            image: image.clone(),
            space,
            row_axis,
            per_row: Arc::new(per_row),
            on_start: None,
            on_problem: None,
            on_complete: None,
            shared: shared.clone(),
        };
        (
            task,
            TaskHandle {
                image,
                shared,
            },
        )
    }

    pub fn on_start(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Registers the Per-Problem callback: fired once for every Problem that
    /// is retired with a successful write to the result row (never for one
    /// whose execution panicked). Unlike the start/complete callbacks this
    /// fires repeatedly, so it takes a `Fn`, not a `FnOnce`.
    pub fn on_problem(mut self, f: impl Fn(Problem) + Send + Sync + 'static) -> Self {
        self.on_problem = Some(Arc::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce(bool) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn space(&self) -> ProblemSpace {
        self.space
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Transitions `Pending -> Started`, firing the start callback exactly
    /// once. Called by the pool from whichever worker claims the first Problem.
    pub fn begin(&mut self) {
        *self.shared.status.lock().unwrap() = TaskStatus::Started;
        if let Some(f) = self.on_start.take() {
            f();
        }
    }

    /// Runs the per-row callback for `p`, catching panics so one bad row
    /// cannot poison the worker thread: the task is marked cancelled, the
    /// panic payload is stashed for re-raise from [`TaskHandle::wait`], and
    /// the pool's cohort drains the remaining in-flight Problems.
    ///
    /// The callback receives this Task's own cancel flag, so long-running
    /// user code (the path-tracing kernel) can poll it directly. On success,
    /// fires the Per-Problem callback after the row write completes, so a
    /// reader that snapshots the row on receipt of the callback always sees
    /// it fully written (§5's refresh protocol).
    pub fn run_problem(&self, p: Problem) {
        let row = p[self.row_axis] as usize;
        let image = &self.image;
        let f = &self.per_row;
        let cancel_flag = &self.shared.cancelled;
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            // Safety: the pool hands out each `row` to exactly one worker per Task.
            let slice = unsafe { image.row_mut(row) };
            f(slice, p, cancel_flag);
        }));
        match result {
            Ok(()) => {
                if let Some(f) = &self.on_problem {
                    f(p);
                }
            }
            Err(payload) => {
                warn!(problem = ?p, "row task panicked; cancelling task");
                *self.shared.panic.lock().unwrap() = Some(payload);
                self.shared.cancelled.store(true, Ordering::Release);
            }
        }
        self.shared.remaining.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn remaining(&self) -> usize {
        self.shared.remaining.load(Ordering::Acquire)
    }

    /// Transitions to `Completed` or `Cancelled`, fires the completion
    /// callback with the success flag, and wakes any thread blocked in
    /// [`TaskHandle::wait`]. The `Image` stays reachable through the handle.
    pub fn finish(mut self) {
        let success = !self.shared.cancelled.load(Ordering::Acquire);
        *self.shared.status.lock().unwrap() = if success {
            TaskStatus::Completed
        } else {
            TaskStatus::Cancelled
        };
        self.shared.cv.notify_all();
        debug!(success, "task retired");
        if let Some(f) = self.on_complete.take() {
            f(success);
        }
    }
}

impl<P: Send + 'static> TaskHandle<P> {
    pub fn status(&self) -> TaskStatus {
        *self.shared.status.lock().unwrap()
    }

    /// Cooperative cancellation: sets the flag the pool checks between
    /// Problems. Does not interrupt a row already in flight.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    pub fn completed(&self) -> bool {
        self.status() == TaskStatus::Completed
    }

    /// Blocks until the task reaches `Completed` or `Cancelled`, then hands
    /// back the result image. Resumes a worker's panic, if one occurred,
    /// rather than silently reporting cancellation.
    pub fn wait(self) -> Image<P> {
        let guard = self.shared.status.lock().unwrap();
        let _guard = self
            .shared
            .cv
            .wait_while(guard, |s| {
                !matches!(s, TaskStatus::Completed | TaskStatus::Cancelled)
            })
            .unwrap();
        drop(_guard);
        if let Some(payload) = self.shared.panic.lock().unwrap().take() {
            std::panic::resume_unwind(payload);
        }
        match Arc::try_unwrap(self.image) {
            Ok(cell) => cell.into_inner(),
            Err(_) => unreachable!("pool drops its Image handle before retiring the task"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::ColourRgb;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn lifecycle_reaches_completed_when_not_cancelled() {
        let image: Image<ColourRgb<f32>> = Image::new(1, 3).unwrap();
        let (mut task, handle) = Task::new(image, ProblemSpace::linear(3), 0, |row, p, _| {
            row[0] = ColourRgb::new(p[0] as f32, 0.0, 0.0);
        });
        task.begin();
        assert_eq!(handle.status(), TaskStatus::Started);
        for p in task.space().iter() {
            task.run_problem(p);
        }
        task.finish();
        assert_eq!(handle.status(), TaskStatus::Completed);
        let img = handle.wait();
        assert_eq!(img.row(1)[0].red, 1.0);
    }

    #[test]
    fn problem_callback_fires_once_per_retired_problem_and_never_on_panic() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let order2 = order.clone();
        let image: Image<u8> = Image::new(1, 3).unwrap();
        let (mut task, handle) = Task::new(image, ProblemSpace::linear(3), 0, |_, p, _| {
            if p[0] == 2 {
                panic!("boom");
            }
        })
        .on_problem(move |p| {
            order2.lock().unwrap().push(p[0]);
        });
        task.begin();
        for p in task.space().iter() {
            task.run_problem(p);
        }
        task.finish();
        assert_eq!(handle.status(), TaskStatus::Cancelled);
        assert_eq!(*order.lock().unwrap(), vec![0, 1]);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handle.wait()));
        assert!(result.is_err());
    }

    #[test]
    fn cancel_flag_is_observed_cooperatively() {
        let counter = Arc::new(AtomicU32::new(0));
        let c2 = counter.clone();
        let image: Image<u8> = Image::new(1, 10).unwrap();
        let (mut task, handle) = Task::new(image, ProblemSpace::linear(10), 0, move |_, _, _| {
            c2.fetch_add(1, Ordering::SeqCst);
        });
        task.begin();
        for (i, p) in task.space().iter().enumerate() {
            if i == 3 {
                handle.cancel();
            }
            if task.is_cancelled() {
                break;
            }
            task.run_problem(p);
        }
        task.finish();
        assert_eq!(handle.status(), TaskStatus::Cancelled);
        assert!(counter.load(Ordering::SeqCst) <= 4);
    }

    #[test]
    fn panicking_row_marks_task_cancelled_and_resumes_on_wait() {
        let image: Image<u8> = Image::new(1, 2).unwrap();
        let (mut task, handle) = Task::new(image, ProblemSpace::linear(2), 0, |_, p, _| {
            if p[0] == 1 {
                panic!("boom");
            }
        });
        task.begin();
        for p in task.space().iter() {
            task.run_problem(p);
        }
        task.finish();
        assert_eq!(handle.status(), TaskStatus::Cancelled);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handle.wait()));
        assert!(result.is_err());
    }
}
