// Copyright (c) 2026 rezky_nightky

use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where the frame loop gets its time and how it sleeps between frames.
pub trait FrameHost {
    fn now(&self) -> Instant;

    /// Blocks for at most `timeout`, servicing host events meanwhile. May
    /// return early.
    fn wait(&mut self, timeout: Duration) -> io::Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Latest measured frame rate, shared with whoever displays it.
#[derive(Clone, Debug, Default)]
pub struct FpsSink(Rc<Cell<Option<f64>>>);

impl FpsSink {
    pub fn publish(&self, fps: f64) {
        self.0.set(Some(fps));
    }

    pub fn latest(&self) -> Option<f64> {
        self.0.get()
    }
}

pub struct FrameScheduler {
    period: Duration,
    sink: FpsSink,
    active: Option<CancelToken>,
}

impl FrameScheduler {
    pub fn new(refresh_rate: f64, sink: FpsSink) -> Self {
        Self {
            period: period_for(refresh_rate),
            sink,
            active: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Takes effect on the next `start`.
    pub fn set_refresh_rate(&mut self, refresh_rate: f64) {
        self.period = period_for(refresh_rate);
    }

    /// Starts a new loop, cancelling the previous one first. The first frame
    /// fires immediately.
    pub fn start(&mut self, now: Instant) -> FrameLoop {
        self.cancel();
        let token = CancelToken::default();
        self.active = Some(token.clone());
        log::debug!("frame loop started at {:?} per frame", self.period);
        FrameLoop {
            token,
            period: self.period,
            next_frame: now,
            previous: None,
            sink: self.sink.clone(),
        }
    }

    /// Stops the active loop, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.active.take() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}

fn period_for(refresh_rate: f64) -> Duration {
    let hz = if refresh_rate.is_finite() && refresh_rate > 0.0 {
        refresh_rate
    } else {
        60.0
    };
    Duration::from_secs_f64(1.0 / hz)
}

pub struct FrameLoop {
    token: CancelToken,
    period: Duration,
    next_frame: Instant,
    previous: Option<Instant>,
    sink: FpsSink,
}

impl FrameLoop {
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Waits for the next frame deadline and returns its timestamp, or
    /// `None` once the loop has been cancelled.
    pub fn next_frame<H: FrameHost + ?Sized>(&mut self, host: &mut H) -> io::Result<Option<Instant>> {
        let mut waited = false;
        loop {
            if self.token.is_cancelled() {
                return Ok(None);
            }
            let now = host.now();
            if now >= self.next_frame {
                break;
            }
            host.wait(self.next_frame - now)?;
            waited = true;
        }

        // A late frame still gives the host one chance to service input.
        if !waited {
            host.wait(Duration::ZERO)?;
            if self.token.is_cancelled() {
                return Ok(None);
            }
        }

        let now = host.now();
        if let Some(prev) = self.previous {
            let delta_ms = now.saturating_duration_since(prev).as_secs_f64() * 1000.0;
            if delta_ms > 0.0 {
                self.sink.publish(1000.0 / delta_ms);
            }
        }
        self.previous = Some(now);

        // Missed deadlines are dropped rather than replayed in a burst.
        self.next_frame += self.period;
        if now > self.next_frame {
            self.next_frame = now + self.period;
        }
        Ok(Some(now))
    }

    /// Calls `frame` once per deadline until the loop is cancelled.
    pub fn run<H, F>(&mut self, host: &mut H, mut frame: F) -> io::Result<()>
    where
        H: FrameHost + ?Sized,
        F: FnMut(&mut H, Instant) -> io::Result<()>,
    {
        while let Some(now) = self.next_frame(host)? {
            frame(host, now)?;
        }
        Ok(())
    }
}
