// SPDX-License-Identifier: GPL-3.0-only

//! Refresh-cadence scheduling for the preview
//!
//! A [`RenderLoop`] runs one unit of work per tick on the caller's thread
//! and owns the cancellation flag. Cancelling is a single transition from
//! [`LoopState::Running`] to [`LoopState::Cancelled`]; once cancelled no
//! further ticks execute.

use crate::backends::camera::frame_loop::LoopAction;
use crate::constants::timing;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Lifecycle of a render loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Cancelled,
}

/// Cloneable handle that cancels the loop from anywhere (signal handlers,
/// other threads)
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        if !self.0.swap(true, Ordering::SeqCst) {
            info!("Render loop cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Self-rescheduling render loop with explicit cancellation
#[derive(Debug)]
pub struct RenderLoop {
    interval: Duration,
    cancelled: CancelHandle,
    ticks: u64,
    next_deadline: Instant,
}

impl RenderLoop {
    /// Loop ticking every `interval`, raised to at least
    /// [`timing::MIN_FRAME_INTERVAL`]
    pub fn new(interval: Duration) -> Self {
        let interval = interval.max(timing::MIN_FRAME_INTERVAL);
        debug!(interval_ms = interval.as_secs_f64() * 1000.0, "Render loop created");
        Self {
            interval,
            cancelled: CancelHandle(Arc::new(AtomicBool::new(false))),
            ticks: 0,
            next_deadline: Instant::now(),
        }
    }

    /// Loop paced at `refresh_rate` ticks per second
    pub fn with_refresh_rate(refresh_rate: u32) -> Self {
        Self::new(timing::frame_interval(refresh_rate))
    }

    pub fn state(&self) -> LoopState {
        if self.cancelled.is_cancelled() {
            LoopState::Cancelled
        } else {
            LoopState::Running
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancelled.clone()
    }

    /// Stop scheduling further ticks
    pub fn cancel(&self) {
        self.cancelled.cancel();
    }

    /// Ticks executed so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one unit of work if still running, then schedule the next tick.
    ///
    /// `work` returning [`LoopAction::Stop`] cancels the loop.
    pub fn tick<F>(&mut self, work: F) -> LoopState
    where
        F: FnOnce() -> LoopAction,
    {
        if !self.is_running() {
            return LoopState::Cancelled;
        }

        self.ticks += 1;
        if work() == LoopAction::Stop {
            self.cancel();
        }

        // Skip missed deadlines instead of bursting to catch up
        let now = Instant::now();
        self.next_deadline += self.interval;
        if self.next_deadline < now {
            self.next_deadline = now + self.interval;
        }

        self.state()
    }

    /// Time to wait before the next tick is due
    pub fn time_until_next_tick(&self) -> Duration {
        self.next_deadline.saturating_duration_since(Instant::now())
    }

    /// Drive the loop on a tokio interval until it is cancelled.
    ///
    /// Yields to the runtime once per tick. Returns the number of ticks run.
    pub async fn run<F>(&mut self, mut work: F) -> u64
    where
        F: FnMut() -> LoopAction,
    {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.is_running() {
            interval.tick().await;
            self.tick(&mut work);
        }

        info!(ticks = self.ticks, "Render loop finished");
        self.ticks
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_single_transition() {
        let render_loop = RenderLoop::with_refresh_rate(60);
        assert_eq!(render_loop.state(), LoopState::Running);
        render_loop.cancel();
        render_loop.cancel();
        assert_eq!(render_loop.state(), LoopState::Cancelled);
    }

    #[test]
    fn test_no_ticks_after_cancel() {
        let mut render_loop = RenderLoop::with_refresh_rate(60);
        let mut ran = 0;

        render_loop.tick(|| {
            ran += 1;
            LoopAction::Continue
        });
        render_loop.cancel_handle().cancel();
        let state = render_loop.tick(|| {
            ran += 1;
            LoopAction::Continue
        });

        assert_eq!(state, LoopState::Cancelled);
        assert_eq!(ran, 1);
        assert_eq!(render_loop.ticks(), 1);
    }

    #[test]
    fn test_stop_action_cancels() {
        let mut render_loop = RenderLoop::with_refresh_rate(60);
        assert_eq!(render_loop.tick(|| LoopAction::Stop), LoopState::Cancelled);
    }

    #[test]
    fn test_next_tick_is_paced() {
        let mut render_loop = RenderLoop::new(Duration::from_millis(50));
        render_loop.tick(|| LoopAction::Continue);
        let wait = render_loop.time_until_next_tick();
        assert!(wait > Duration::from_millis(10));
        assert!(wait <= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_zero_interval_runs() {
        let mut render_loop = RenderLoop::new(Duration::ZERO);
        let handle = render_loop.cancel_handle();
        let mut count = 0;

        let ticks = render_loop
            .run(|| {
                count += 1;
                if count == 3 {
                    handle.cancel();
                }
                LoopAction::Continue
            })
            .await;

        assert_eq!(ticks, 3);
        assert_eq!(render_loop.state(), LoopState::Cancelled);
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let mut render_loop = RenderLoop::new(Duration::from_millis(1));
        let handle = render_loop.cancel_handle();
        let mut count = 0;

        let ticks = render_loop
            .run(|| {
                count += 1;
                if count == 5 {
                    handle.cancel();
                }
                LoopAction::Continue
            })
            .await;

        assert_eq!(ticks, 5);
        assert_eq!(count, 5);
    }
}
