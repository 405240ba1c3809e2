//! Window and frame context management.
//!
//! The underlying driver has exactly one current window/frame context, and
//! sibling frames cannot be reached by a direct cross-switch, so every
//! frame switch resets to default content first. [`BrowserSession`] keeps
//! that context as an explicit value instead of process-global state:
//! tests can run independent sessions without cross-talk, and the tracked
//! context is inspectable at any point.
//!
//! A window or frame that does not exist yet is an expected, retryable
//! condition (a popup or report frame still rendering). Switches report
//! `false` after their bounded attempts; they never propagate raw driver
//! failures.

use crate::clock::Deadline;
use crate::driver::{SharedDriver, WindowHandle};
use crate::sync::SyncEngine;
use std::time::Duration;
use tracing::{debug, warn};

/// Tracked window/frame context over one driver session.
///
/// Invariant: the tracked context always reflects the last successful
/// switch. A failed switch attempt leaves the session pointing at default
/// content of the window it was in, never at a half-switched frame chain.
#[derive(Debug, Clone)]
pub struct BrowserSession {
    driver: SharedDriver,
    sync: SyncEngine,
    main_window: WindowHandle,
    current_window: WindowHandle,
    current_frame: Vec<String>,
}

impl BrowserSession {
    /// Open a session against the driver's current window, which becomes
    /// the session's main window.
    ///
    /// # Errors
    ///
    /// Propagates the driver failure when no current window exists.
    pub fn new(driver: SharedDriver, sync: SyncEngine) -> crate::result::NavegarResult<Self> {
        let main_window = driver.current_window_handle()?;
        Ok(Self {
            driver,
            sync,
            current_window: main_window.clone(),
            main_window,
            current_frame: Vec::new(),
        })
    }

    /// The window the session was opened against.
    #[must_use]
    pub fn main_window(&self) -> &WindowHandle {
        &self.main_window
    }

    /// The window of the last successful switch.
    #[must_use]
    pub fn current_window(&self) -> &WindowHandle {
        &self.current_window
    }

    /// The frame chain of the last successful switch; empty means default
    /// content.
    #[must_use]
    pub fn current_frame(&self) -> &[String] {
        &self.current_frame
    }

    /// The synchronization engine the session polls with.
    #[must_use]
    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    /// The underlying driver. All queries act against the session's
    /// current context.
    #[must_use]
    pub fn driver(&self) -> &SharedDriver {
        &self.driver
    }

    /// Switch to the given window. Returns `false` when the window does
    /// not exist, leaving the tracked context unchanged.
    pub fn switch_to_window(&mut self, handle: &WindowHandle) -> bool {
        match self.driver.switch_to_window(handle) {
            Ok(()) => {
                self.current_window = handle.clone();
                self.current_frame.clear();
                true
            }
            Err(err) => {
                debug!(window = %handle, %err, "window switch failed");
                false
            }
        }
    }

    /// Poll the set of window handles until one appears that differs from
    /// the currently tracked window, then switch to it.
    ///
    /// Returns `false` when no new window opened within `timeout`.
    pub fn switch_to_newly_opened_window(&mut self, timeout: Duration) -> bool {
        let previous = self.current_window.clone();
        let interval = self.sync.config().poll_interval();
        let clock = self.sync.clock().clone();
        let deadline = Deadline::after(&*clock, timeout);
        loop {
            if let Ok(handles) = self.driver.all_window_handles() {
                if let Some(opened) = handles.into_iter().find(|h| *h != previous) {
                    return self.switch_to_window(&opened);
                }
            }
            if deadline.expired(&*clock) {
                debug!(timeout_ms = timeout.as_millis() as u64, "no new window opened");
                return false;
            }
            clock.sleep(interval);
        }
    }

    /// Return to the main window and its default content.
    pub fn switch_to_main_window(&mut self) -> bool {
        let main = self.main_window.clone();
        self.switch_to_window(&main)
    }

    /// Reset the driver to the default content of the current window.
    pub fn switch_to_default_content(&mut self) -> bool {
        match self.driver.switch_to_default_content() {
            Ok(()) => {
                self.current_frame.clear();
                true
            }
            Err(err) => {
                warn!(%err, "default content reset failed");
                false
            }
        }
    }

    /// Switch into a frame by name. A dotted compound name (`parent.child`)
    /// performs one switch per segment, outermost first.
    ///
    /// Always resets to default content before switching. On any failed
    /// segment the session resets to default content again and reports
    /// `false`, so no half-switched chain is ever left behind.
    pub fn switch_to_frame(&mut self, frame_name: &str) -> bool {
        if frame_name.trim().is_empty() {
            warn!("empty frame name, refusing to switch");
            return false;
        }
        if !self.switch_to_default_content() {
            return false;
        }
        let mut entered = Vec::new();
        for segment in frame_name.split('.') {
            match self.driver.switch_to_frame(segment) {
                Ok(()) => entered.push(segment.to_string()),
                Err(err) => {
                    debug!(frame = frame_name, segment, %err, "frame switch failed");
                    self.switch_to_default_content();
                    return false;
                }
            }
        }
        self.current_frame = entered;
        true
    }

    /// Retry [`Self::switch_to_frame`] until it succeeds or `timeout`
    /// expires. Covers frames in a newly opened window or a frame that is
    /// being re-rendered after a refresh.
    pub fn switch_to_frame_when_present(&mut self, frame_name: &str, timeout: Duration) -> bool {
        let interval = self.sync.config().poll_interval();
        let clock = self.sync.clock().clone();
        let deadline = Deadline::after(&*clock, timeout);
        loop {
            if self.switch_to_frame(frame_name) {
                return true;
            }
            if deadline.expired(&*clock) {
                debug!(frame = frame_name, "frame never became switchable");
                return false;
            }
            clock.sleep(interval);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::{Clock, TestClock};
    use crate::config::SyncConfig;
    use crate::driver::Driver;
    use crate::mock::FakeDriver;
    use std::sync::Arc;

    fn session() -> (Arc<TestClock>, Arc<FakeDriver>, BrowserSession) {
        let clock = Arc::new(TestClock::new());
        let driver = Arc::new(FakeDriver::new(clock.clone()));
        let sync = SyncEngine::new(
            driver.clone(),
            clock.clone(),
            SyncConfig::new().with_poll_interval(100),
        );
        let session = BrowserSession::new(driver.clone(), sync).unwrap();
        (clock, driver, session)
    }

    #[test]
    fn test_opens_against_current_window() {
        let (_, _, session) = session();
        assert_eq!(session.main_window().as_str(), "main");
        assert_eq!(session.current_window(), session.main_window());
        assert!(session.current_frame().is_empty());
    }

    #[test]
    fn test_window_switch_tracks_context() {
        let (_, driver, mut session) = session();
        driver.add_window("popup");
        assert!(session.switch_to_window(&WindowHandle("popup".to_string())));
        assert_eq!(session.current_window().as_str(), "popup");
    }

    #[test]
    fn test_failed_window_switch_keeps_context() {
        let (_, _, mut session) = session();
        assert!(!session.switch_to_window(&WindowHandle("missing".to_string())));
        assert_eq!(session.current_window().as_str(), "main");
    }

    #[test]
    fn test_dotted_frame_name_switches_twice() {
        let (_, driver, mut session) = session();
        driver.add_frame("main", "shell");
        driver.add_frame("main", "shell.content");
        assert!(session.switch_to_frame("shell.content"));
        assert_eq!(session.current_frame(), ["shell", "content"]);
    }

    #[test]
    fn test_frame_switch_resets_to_default_content_first() {
        // From inside one frame, a sibling frame must still be reachable.
        let (_, driver, mut session) = session();
        driver.add_frame("main", "left");
        driver.add_frame("main", "right");
        assert!(session.switch_to_frame("left"));
        assert!(session.switch_to_frame("right"));
        assert_eq!(session.current_frame(), ["right"]);
    }

    #[test]
    fn test_failed_frame_switch_leaves_no_partial_chain() {
        let (_, driver, mut session) = session();
        driver.add_frame("main", "shell");
        assert!(!session.switch_to_frame("shell.missing"));
        assert!(session.current_frame().is_empty());
    }

    #[test]
    fn test_empty_frame_name_is_refused() {
        let (_, _, mut session) = session();
        assert!(!session.switch_to_frame(""));
        assert!(!session.switch_to_frame("   "));
    }

    #[test]
    fn test_newly_opened_window_is_detected() {
        let (_, driver, mut session) = session();
        driver.when_script("openPopup", |state| {
            state.add_window("report-viewer");
        });
        driver.evaluate_script("openPopup();").unwrap();
        assert!(session.switch_to_newly_opened_window(Duration::from_millis(1_000)));
        assert_eq!(session.current_window().as_str(), "report-viewer");
    }

    #[test]
    fn test_newly_opened_window_times_out() {
        let (clock, _, mut session) = session();
        assert!(!session.switch_to_newly_opened_window(Duration::from_millis(500)));
        assert!(clock.now_ms() >= 500);
        assert_eq!(session.current_window().as_str(), "main");
    }

    #[test]
    fn test_frame_when_present_retries_until_rendered() {
        let (_, driver, mut session) = session();
        driver.when_script("tick", |state| {
            state.add_frame("main", "report");
        });
        assert!(!session.switch_to_frame("report"));
        driver.evaluate_script("tick();").unwrap();
        assert!(session.switch_to_frame_when_present("report", Duration::from_millis(1_000)));
        assert_eq!(session.current_frame(), ["report"]);
    }

    #[test]
    fn test_window_switch_clears_frame_context() {
        let (_, driver, mut session) = session();
        driver.add_frame("main", "shell");
        driver.add_window("popup");
        assert!(session.switch_to_frame("shell"));
        assert!(session.switch_to_window(&WindowHandle("popup".to_string())));
        assert!(session.current_frame().is_empty());
    }
}
