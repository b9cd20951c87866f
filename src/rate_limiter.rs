/*!
 * Sliding-window rate limiting for provider API calls.
 *
 * Each provider gets its own window: at most `max_calls` calls may start
 * within any trailing `time_frame` interval. Acquisition is scoped - the
 * returned permit unwinds the in-flight count when dropped, on every exit
 * path including errors.
 */

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::Mutex;

use crate::errors::ProviderError;
use crate::providers::ProviderKind;

/// How many full windows to wait before giving up on admission.
/// A correctly sized window never hits this; when it does the caller
/// treats it like any other provider failure.
const ACQUIRE_TIMEOUT_WINDOWS: u32 = 10;

/// Sliding-window admission control for a single provider
pub struct SlidingWindowRateLimiter {
    /// Maximum calls allowed to start within the window
    max_calls: usize,

    /// Trailing window length
    time_frame: Duration,

    /// Start timestamps of admitted calls, oldest first
    calls: Mutex<VecDeque<Instant>>,

    /// Calls currently holding a permit
    in_flight: AtomicUsize,
}

impl SlidingWindowRateLimiter {
    /// Create a new limiter admitting `max_calls` per `time_frame`
    pub fn new(max_calls: usize, time_frame: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            time_frame,
            calls: Mutex::new(VecDeque::new()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Block (asynchronously) until a call may start, then record it.
    ///
    /// Returns a permit that must be held for the duration of the call.
    pub async fn acquire(&self, label: &str) -> Result<RateLimitPermit<'_>, ProviderError> {
        let deadline = Instant::now() + self.time_frame * ACQUIRE_TIMEOUT_WINDOWS;

        loop {
            let wait = {
                let mut calls = self.calls.lock();
                let now = Instant::now();
                while calls
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.time_frame)
                {
                    calls.pop_front();
                }

                if calls.len() < self.max_calls {
                    calls.push_back(now);
                    self.in_flight.fetch_add(1, Ordering::SeqCst);
                    debug!("[RATE_LIMIT] Query passing through rate limit for {}", label);
                    None
                } else {
                    // Window is full; the oldest call ages out first
                    match calls.front() {
                        Some(oldest) => Some(
                            self.time_frame
                                .saturating_sub(now.duration_since(*oldest)),
                        ),
                        None => Some(Duration::from_millis(50)),
                    }
                }
            };

            match wait {
                None => return Ok(RateLimitPermit { limiter: self }),
                Some(wait) => {
                    if Instant::now() + wait > deadline {
                        return Err(ProviderError::RateLimitTimeout(format!(
                            "no {} slot freed within {} windows",
                            label, ACQUIRE_TIMEOUT_WINDOWS
                        )));
                    }
                    debug!(
                        "[RATE_LIMIT] Rate limit reached for {}. Waiting for {:.2} seconds",
                        label,
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait.max(Duration::from_millis(10))).await;
                }
            }
        }
    }

    /// Number of calls that could start right now without waiting
    pub fn remaining_calls(&self) -> usize {
        let mut calls = self.calls.lock();
        let now = Instant::now();
        while calls
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.time_frame)
        {
            calls.pop_front();
        }
        self.max_calls.saturating_sub(calls.len())
    }

    /// Calls currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Scoped admission permit; dropping it unwinds the in-flight count
pub struct RateLimitPermit<'a> {
    limiter: &'a SlidingWindowRateLimiter,
}

impl Drop for RateLimitPermit<'_> {
    fn drop(&mut self) {
        self.limiter.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Per-provider rate limiters, shared by all worker tasks
pub struct RateLimiter {
    anthropic: SlidingWindowRateLimiter,
    openai: SlidingWindowRateLimiter,
}

impl RateLimiter {
    /// Create limiters from per-provider (max_calls, time_frame) settings
    pub fn new(
        anthropic_max_calls: usize,
        anthropic_time_frame: Duration,
        openai_max_calls: usize,
        openai_time_frame: Duration,
    ) -> Self {
        Self {
            anthropic: SlidingWindowRateLimiter::new(anthropic_max_calls, anthropic_time_frame),
            openai: SlidingWindowRateLimiter::new(openai_max_calls, openai_time_frame),
        }
    }

    /// Acquire an admission slot for the given provider
    pub async fn acquire(
        &self,
        provider: ProviderKind,
    ) -> Result<RateLimitPermit<'_>, ProviderError> {
        self.window(provider).acquire(provider.display_name()).await
    }

    /// Remaining calls for the given provider's current window
    pub fn remaining_calls(&self, provider: ProviderKind) -> usize {
        self.window(provider).remaining_calls()
    }

    fn window(&self, provider: ProviderKind) -> &SlidingWindowRateLimiter {
        match provider {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenAi => &self.openai,
        }
    }
}
