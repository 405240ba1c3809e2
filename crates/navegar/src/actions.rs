//! Action facade: the operations exposed to test scripts.
//!
//! Every action is the same fixed composition: blocking-overlay barrier,
//! locator resolution, the driver action, and (for mutating actions) a
//! re-read to confirm the effect. The composition order is the core
//! correctness property of the engine and is never reordered.
//!
//! A failed action reports `false` to the calling script, which is
//! expected to assert on it; there is no automatic retry across this
//! boundary. Each call attempts the operation exactly once against its
//! own internal bounded waits.
//!
//! Given a shared [`TraceRecorder`], the facade records one step per
//! stage of every operation it performs.

use crate::config::ActionConfig;
use crate::driver::{ElementHandle, SharedDriver, SpecialKeys};
use crate::locator::{CandidateSet, Locator, LocatorTemplate, Resolver};
use crate::result::{NavegarError, NavegarResult};
use crate::sync::SyncEngine;
use crate::trace::{SharedRecorder, StepKind, TraceRecorder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Closed set of widget flavors the facade acts on.
///
/// Chosen by [`classify_widget`] from the resolved element, not by
/// attribute sniffing at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WidgetKind {
    /// Non-editable text
    Label,
    /// Plain text input or textarea
    TextInput,
    /// Drop-down selection
    ComboBox,
    /// Two-state checkbox
    CheckBox,
    /// Clickable button
    Button,
}

/// Classify a resolved element into its widget flavor.
#[must_use]
pub fn classify_widget(handle: &ElementHandle, input_type: Option<&str>) -> WidgetKind {
    match handle.tag_name.as_str() {
        "select" => WidgetKind::ComboBox,
        "button" => WidgetKind::Button,
        "textarea" => WidgetKind::TextInput,
        "input" => match input_type {
            Some("checkbox") => WidgetKind::CheckBox,
            Some("button" | "submit") => WidgetKind::Button,
            _ => WidgetKind::TextInput,
        },
        _ => WidgetKind::Label,
    }
}

/// How a field's prior content is removed before typing.
///
/// No single technique behaves consistently across all rendered field
/// types: plain inputs honor a native clear, grid cells need a
/// select-all-then-delete key sequence, and formatted cells (numeric,
/// date) only give up their content to a script value assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearStrategy {
    /// Driver-native clear
    Native,
    /// Select-all followed by delete
    SelectAllDelete,
    /// Script-based empty value assignment
    ScriptAssign,
}

impl ClearStrategy {
    /// Default strategy for a widget flavor.
    #[must_use]
    pub fn for_widget(kind: WidgetKind) -> Self {
        match kind {
            WidgetKind::TextInput => Self::Native,
            _ => Self::SelectAllDelete,
        }
    }
}

/// The operations exposed to callers.
#[derive(Debug, Clone)]
pub struct Actions {
    driver: SharedDriver,
    sync: SyncEngine,
    resolver: Resolver,
    config: ActionConfig,
    recorder: Option<SharedRecorder>,
}

impl Actions {
    /// Create the facade over a driver and its synchronization engine.
    #[must_use]
    pub fn new(driver: SharedDriver, sync: SyncEngine, config: ActionConfig) -> Self {
        let resolver = Resolver::new(driver.clone(), sync.clone());
        Self {
            driver,
            sync,
            resolver,
            config,
            recorder: None,
        }
    }

    /// Record every operation's stages into `recorder`.
    #[must_use]
    pub fn with_recorder(mut self, recorder: SharedRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// The resolver actions go through.
    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Whether an element currently matches `locator`. Fails fast; no
    /// implicit wait.
    #[must_use]
    pub fn exists(&self, locator: &Locator) -> bool {
        self.resolver.resolve_one(locator, false).is_ok()
    }

    /// Click the element.
    #[must_use]
    pub fn click(&self, locator: &Locator) -> bool {
        self.record(|r| r.begin(format!("click {locator}")));
        let outcome = self.attempt(locator, "click", |handle| self.driver.click(handle));
        self.record(TraceRecorder::finish);
        outcome
    }

    /// Read the element's visible text.
    ///
    /// # Errors
    ///
    /// Propagates resolution failures; the caller demanded existence.
    pub fn read_text(&self, locator: &Locator) -> NavegarResult<String> {
        let handle = self.resolver.resolve_one(locator, true)?;
        Ok(self.driver.get_text(&handle)?)
    }

    /// Read the interactive sub-element behind a structural field: value
    /// attribute for an editable shape, visible text for the non-editable
    /// fallback.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::NavegarError::NoCandidateMatched`] when no
    /// structural shape resolves.
    pub fn read_structural(&self, base: &Locator, candidates: &CandidateSet) -> NavegarResult<String> {
        let (handle, _) = self.resolver.resolve_first_of(candidates, base)?;
        if let Some(value) = self.driver.get_attribute(&handle, "value")? {
            return Ok(value);
        }
        Ok(self.driver.get_text(&handle)?)
    }

    /// Clear the field, then type `text`, then confirm the read-back value
    /// equals `text`. The clearing strategy defaults per widget flavor.
    #[must_use]
    pub fn type_text(&self, locator: &Locator, text: &str) -> bool {
        self.record(|r| r.begin(format!("type into {locator}")));
        let outcome = self.resolve_for_action(locator).is_some_and(|handle| {
            let strategy = ClearStrategy::for_widget(self.widget_kind(&handle));
            self.type_into(locator, &handle, text, strategy)
        });
        self.record(TraceRecorder::finish);
        outcome
    }

    /// [`Self::type_text`] with an explicit clearing strategy.
    #[must_use]
    pub fn type_text_with(&self, locator: &Locator, text: &str, strategy: ClearStrategy) -> bool {
        self.record(|r| r.begin(format!("type into {locator}")));
        let outcome = self
            .resolve_for_action(locator)
            .is_some_and(|handle| self.type_into(locator, &handle, text, strategy));
        self.record(TraceRecorder::finish);
        outcome
    }

    /// Clear the field and confirm the read-back value is empty.
    #[must_use]
    pub fn clear(&self, locator: &Locator, strategy: ClearStrategy) -> bool {
        self.record(|r| r.begin(format!("clear {locator}")));
        let outcome = self.resolve_for_action(locator).is_some_and(|handle| {
            self.clear_with(locator, &handle, strategy) && self.value_equals(&handle, "")
        });
        self.record(TraceRecorder::finish);
        outcome
    }

    /// Select an option in a combo box by its value, then wait out the
    /// background calls a selection triggers.
    #[must_use]
    pub fn select(&self, locator: &Locator, option: &str) -> bool {
        self.record(|r| r.begin(format!("select in {locator}")));
        let outcome = self.resolve_for_action(locator).is_some_and(|handle| {
            let sent = self.driver.send_keys(&handle, option);
            self.record(|r| r.step(StepKind::Act, "select option", sent.is_ok()));
            if let Err(err) = sent {
                debug!(%locator, %err, "selection failed");
                return false;
            }
            let settled = self.sync.wait_for_no_outstanding_async_work(
                self.config.select_settle_timeout(),
                self.sync.config().poll_interval(),
            );
            self.record(|r| r.step(StepKind::Synchronize, "async settle", settled));
            if !settled {
                warn!(%locator, "async work still pending after selection");
                return false;
            }
            self.value_equals(&handle, option)
        });
        self.record(TraceRecorder::finish);
        outcome
    }

    /// Drive a checkbox to the requested state, clicking only when the
    /// current state differs.
    #[must_use]
    pub fn set_checked(&self, locator: &Locator, checked: bool) -> bool {
        self.record(|r| r.begin(format!("set_checked {locator}")));
        let outcome = self.resolve_for_action(locator).is_some_and(|handle| {
            if self.is_checked(&handle) != checked {
                let clicked = self.driver.click(&handle);
                self.record(|r| r.step(StepKind::Act, "toggle", clicked.is_ok()));
                if let Err(err) = clicked {
                    debug!(%locator, %err, "checkbox click failed");
                    return false;
                }
            }
            let confirmed = self.is_checked(&handle) == checked;
            self.record(|r| r.step(StepKind::Verify, "checked state", confirmed));
            confirmed
        });
        self.record(TraceRecorder::finish);
        outcome
    }

    /// Whether the checkbox is currently checked.
    ///
    /// # Errors
    ///
    /// Propagates resolution failures, and reports
    /// [`NavegarError::AmbiguousUiState`] when the resolved element is not
    /// a checkbox at all; "checked" has no defined meaning there.
    pub fn read_checked(&self, locator: &Locator) -> NavegarResult<bool> {
        let handle = self.resolver.resolve_one(locator, true)?;
        if self.widget_kind(&handle) != WidgetKind::CheckBox {
            return Err(NavegarError::AmbiguousUiState {
                message: format!("'{locator}' is not a checkbox"),
            });
        }
        Ok(self.is_checked(&handle))
    }

    /// Whether the element is disabled.
    ///
    /// An element lacking both a `disabled` attribute and a usable enabled
    /// state is ambiguous; the documented fallback is "not disabled".
    ///
    /// # Errors
    ///
    /// Propagates resolution failures.
    pub fn is_disabled(&self, locator: &Locator) -> NavegarResult<bool> {
        let handle = self.resolver.resolve_one(locator, true)?;
        if let Some(value) = self.driver.get_attribute(&handle, "disabled")? {
            return Ok(!value.eq_ignore_ascii_case("false"));
        }
        match self.driver.is_enabled(&handle) {
            Ok(enabled) => Ok(!enabled),
            Err(err) => {
                warn!(%locator, %err, "enabled state unreadable, defaulting to enabled");
                Ok(false)
            }
        }
    }

    fn type_into(
        &self,
        locator: &Locator,
        handle: &ElementHandle,
        text: &str,
        strategy: ClearStrategy,
    ) -> bool {
        if !self.clear_with(locator, handle, strategy) {
            return false;
        }
        let typed = self.driver.send_keys(handle, text);
        self.record(|r| r.step(StepKind::Act, "send_keys", typed.is_ok()));
        if let Err(err) = typed {
            debug!(%locator, %err, "typing failed");
            return false;
        }
        // Confirm the clear fully removed the prior value instead of
        // leaving a merged string.
        self.value_equals(handle, text)
    }

    fn clear_with(&self, locator: &Locator, handle: &ElementHandle, strategy: ClearStrategy) -> bool {
        let outcome = match strategy {
            ClearStrategy::Native => self.driver.clear(handle),
            ClearStrategy::SelectAllDelete => self
                .driver
                .send_special(handle, SpecialKeys::SelectAll)
                .and_then(|()| self.driver.send_special(handle, SpecialKeys::Delete)),
            ClearStrategy::ScriptAssign => {
                let script = LocatorTemplate::new(&self.config.clear_value_script)
                    .fill(locator.raw());
                self.driver.evaluate_script(&script).map(|_| ())
            }
        };
        self.record(|r| r.step(StepKind::Act, "clear", outcome.is_ok()));
        match outcome {
            Ok(()) => true,
            Err(err) => {
                debug!(%locator, ?strategy, %err, "clear failed");
                false
            }
        }
    }

    fn attempt<F>(&self, locator: &Locator, label: &str, action: F) -> bool
    where
        F: FnOnce(&ElementHandle) -> NavegarResult<()>,
    {
        let Some(handle) = self.resolve_for_action(locator) else {
            return false;
        };
        let outcome = action(&handle);
        self.record(|r| r.step(StepKind::Act, label, outcome.is_ok()));
        match outcome {
            Ok(()) => true,
            Err(err) => {
                debug!(%locator, %err, "action failed");
                false
            }
        }
    }

    fn resolve_for_action(&self, locator: &Locator) -> Option<ElementHandle> {
        let synchronized = self.sync.wait_for_no_blocking_overlay();
        self.record(|r| r.step(StepKind::Synchronize, "overlay barrier", synchronized));
        if !synchronized {
            debug!(%locator, "blocking overlay never cleared");
            return None;
        }
        match self.resolver.resolve_one(locator, true) {
            Ok(handle) => {
                self.record(|r| r.step(StepKind::Resolve, locator.raw(), true));
                Some(handle)
            }
            Err(err) => {
                self.record(|r| r.step(StepKind::Resolve, locator.raw(), false));
                debug!(%locator, %err, "resolution failed");
                None
            }
        }
    }

    fn record(&self, entry: impl FnOnce(&mut TraceRecorder)) {
        if let Some(recorder) = &self.recorder {
            let mut guard = recorder
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            entry(&mut guard);
        }
    }

    fn widget_kind(&self, handle: &ElementHandle) -> WidgetKind {
        let input_type = self
            .driver
            .get_attribute(handle, "type")
            .ok()
            .flatten();
        classify_widget(handle, input_type.as_deref())
    }

    // An explicit checked="false" counts as unchecked, matching the
    // disabled-attribute value check above.
    fn is_checked(&self, handle: &ElementHandle) -> bool {
        self.driver
            .get_attribute(handle, "checked")
            .ok()
            .flatten()
            .is_some_and(|value| !value.eq_ignore_ascii_case("false"))
    }

    fn value_equals(&self, handle: &ElementHandle, expected: &str) -> bool {
        let outcome = match self.driver.get_attribute(handle, "value") {
            Ok(Some(value)) => value == expected,
            Ok(None) => expected.is_empty(),
            Err(err) => {
                debug!(%err, "read-back failed");
                false
            }
        };
        self.record(|r| r.step(StepKind::Verify, format!("value == {expected}"), outcome));
        outcome
    }
}
