//! Synchronization engine: deadline-driven polling waits.
//!
//! Every wait is a busy-poll loop with a sleep, executed on the calling
//! thread and bounded by a [`Deadline`] computed once at wait start. Timeout
//! is a normal, expected outcome reported as `false`; deciding whether a
//! `false` is fatal belongs to the caller, which keeps the engine itself
//! non-opinionated about severity.
//!
//! Driver failures inside a wait predicate (the element vanished mid-poll,
//! the window was torn down) are treated as "condition not satisfied yet"
//! and logged, never propagated.

use crate::clock::{Deadline, SharedClock};
use crate::config::SyncConfig;
use crate::driver::{SharedDriver};
use crate::locator::Locator;
use serde_json::Value;
use std::time::Duration;
use tracing::{trace, warn};

/// Polling-based synchronization over the external driver.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    driver: SharedDriver,
    clock: SharedClock,
    config: SyncConfig,
}

impl SyncEngine {
    /// Create a new synchronization engine.
    #[must_use]
    pub fn new(driver: SharedDriver, clock: SharedClock, config: SyncConfig) -> Self {
        Self {
            driver,
            clock,
            config,
        }
    }

    /// The engine's timing configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The clock driving all deadlines.
    #[must_use]
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Poll `predicate` every `interval` until it holds or `timeout` expires.
    ///
    /// Returns `true` the moment the predicate first holds; returns `false`
    /// on expiry. The deadline is fixed at entry and never extended, so the
    /// loop cannot run past `timeout` by more than one poll interval.
    pub fn wait_for_condition<F>(&self, mut predicate: F, timeout: Duration, interval: Duration) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = Deadline::after(&*self.clock, timeout);
        while !deadline.expired(&*self.clock) {
            if predicate() {
                return true;
            }
            self.clock.sleep(interval);
        }
        trace!(timeout_ms = timeout.as_millis() as u64, "wait expired");
        false
    }

    /// Wait until at least one element matches `locator`.
    pub fn wait_for_presence(&self, locator: &Locator, timeout: Duration, interval: Duration) -> bool {
        self.wait_for_condition(|| self.count(locator) > 0, timeout, interval)
    }

    /// Wait until no element matches `locator`.
    pub fn wait_for_absence(&self, locator: &Locator, timeout: Duration, interval: Duration) -> bool {
        self.wait_for_condition(|| self.count(locator) == 0, timeout, interval)
    }

    /// Wait until an element matches `locator` and is displayed.
    pub fn wait_for_visible_and_present(
        &self,
        locator: &Locator,
        timeout: Duration,
        interval: Duration,
    ) -> bool {
        self.wait_for_condition(
            || match self.first(locator) {
                Some(handle) => self.driver.is_displayed(&handle).unwrap_or(false),
                None => false,
            },
            timeout,
            interval,
        )
    }

    /// Wait until the element's trimmed text equals `text`.
    pub fn wait_for_content_equals(
        &self,
        locator: &Locator,
        text: &str,
        timeout: Duration,
        interval: Duration,
    ) -> bool {
        let expected = text.trim();
        self.wait_for_condition(
            || match self.first(locator) {
                Some(handle) => self
                    .driver
                    .get_text(&handle)
                    .map(|actual| actual.trim() == expected)
                    .unwrap_or(false),
                None => false,
            },
            timeout,
            interval,
        )
    }

    /// Block until the page-blocking loading indicator is gone.
    ///
    /// If no overlay element exists on the page at all, this succeeds
    /// immediately: a screen genuinely without the widget must not be
    /// treated as "still loading" forever. Known gap: such a screen may
    /// still have unfinished asynchronous rendering; callers that know
    /// better can follow with [`Self::wait_for_no_outstanding_async_work`].
    ///
    /// Otherwise polls until the overlay stops being displayed, bounded by
    /// the configured ceiling (default 120 polls at one-second spacing).
    pub fn wait_for_no_blocking_overlay(&self) -> bool {
        let overlay = match Locator::parse(&self.config.overlay_locator) {
            Ok(locator) => locator,
            Err(err) => {
                warn!(%err, "overlay locator invalid, skipping overlay barrier");
                return true;
            }
        };
        if self.count(&overlay) == 0 {
            return true;
        }
        for _ in 0..self.config.overlay_poll_limit {
            let displayed = match self.first(&overlay) {
                Some(handle) => self.driver.is_displayed(&handle).unwrap_or(false),
                // Overlay removed from the DOM entirely mid-wait
                None => false,
            };
            if !displayed {
                return true;
            }
            self.clock.sleep(self.config.overlay_poll_interval());
        }
        warn!(
            polls = self.config.overlay_poll_limit,
            "blocking overlay still displayed after poll ceiling"
        );
        false
    }

    /// Wait until the driver's script probe reports no outstanding
    /// asynchronous work.
    ///
    /// The configured probe script must evaluate to `true` when idle.
    /// A non-boolean probe result is treated as still pending and logged.
    pub fn wait_for_no_outstanding_async_work(&self, timeout: Duration, interval: Duration) -> bool {
        self.wait_for_condition(|| self.probe_idle(), timeout, interval)
    }

    /// Fixed settle pause. Used only where a racing check would land
    /// mid-teardown of a scripted animation; prefer a wait condition.
    pub fn pause(&self, interval: Duration) {
        self.clock.sleep(interval);
    }

    fn probe_idle(&self) -> bool {
        match self.driver.evaluate_script(&self.config.async_probe_script) {
            Ok(Value::Bool(idle)) => idle,
            Ok(other) => {
                warn!(result = %other, "async probe returned non-boolean, treating as pending");
                false
            }
            Err(err) => {
                trace!(%err, "async probe failed, treating as pending");
                false
            }
        }
    }

    fn count(&self, locator: &Locator) -> usize {
        match self.driver.find_elements(locator) {
            Ok(found) => found.len(),
            Err(err) => {
                trace!(locator = %locator, %err, "find failed, treating as absent");
                0
            }
        }
    }

    fn first(&self, locator: &Locator) -> Option<crate::driver::ElementHandle> {
        self.driver
            .find_elements(locator)
            .ok()
            .and_then(|found| found.into_iter().next())
    }
}
