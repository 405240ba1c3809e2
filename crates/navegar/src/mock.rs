//! Scriptable in-memory driver for browser-free tests.
//!
//! [`FakeDriver`] models just enough of a browser for the engine's test
//! surface: windows holding frames holding elements keyed by locator
//! string, element appearance/visibility tied to the injected clock, and a
//! programmable script evaluator (canned return values plus side-effect
//! hooks), so forced-visibility scripts and async probes can be exercised
//! without a browser process.

use crate::clock::SharedClock;
use crate::driver::{Driver, ElementHandle, SpecialKeys, WindowHandle};
use crate::locator::Locator;
use crate::result::{NavegarError, NavegarResult};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

/// Side-effect hook run when a matching script is evaluated.
pub type ScriptHook = Box<dyn FnMut(&mut PageState) + Send>;

/// A single element in the fake page model.
#[derive(Debug, Clone)]
pub struct FakeElement {
    tag: String,
    text: String,
    attributes: BTreeMap<String, String>,
    displayed: bool,
    enabled: bool,
    appear_at_ms: u64,
    hide_at_ms: Option<u64>,
    selected_all: bool,
    clicks: u32,
}

impl FakeElement {
    /// Create an element with the given tag, visible and enabled.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: String::new(),
            attributes: BTreeMap::new(),
            displayed: true,
            enabled: true,
            appear_at_ms: 0,
            hide_at_ms: None,
            selected_all: false,
            clicks: 0,
        }
    }

    /// Set the visible text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the `value` attribute.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.attributes.insert("value".to_string(), value.into());
        self
    }

    /// Set an arbitrary attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Mark the element as present but not displayed.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Mark the element as disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self.attributes
            .insert("disabled".to_string(), "true".to_string());
        self
    }

    /// The element joins the DOM once the clock reaches `at_ms`.
    #[must_use]
    pub fn appearing_at_ms(mut self, at_ms: u64) -> Self {
        self.appear_at_ms = at_ms;
        self
    }

    /// The element stops being displayed once the clock reaches `at_ms`.
    #[must_use]
    pub fn hiding_at_ms(mut self, at_ms: u64) -> Self {
        self.hide_at_ms = Some(at_ms);
        self
    }
}

#[derive(Debug, Default)]
struct FakeFrame {
    elements: BTreeMap<String, FakeElement>,
}

#[derive(Debug, Default)]
struct FakeWindow {
    // Key "" is the default content; nested frames use dotted paths.
    frames: BTreeMap<String, FakeFrame>,
    url: String,
}

impl FakeWindow {
    fn with_default_content() -> Self {
        let mut frames = BTreeMap::new();
        frames.insert(String::new(), FakeFrame::default());
        Self {
            frames,
            url: "about:blank".to_string(),
        }
    }
}

/// Mutable page model handed to script hooks.
pub struct PageState {
    windows: BTreeMap<String, FakeWindow>,
    current_window: String,
    current_frame: Vec<String>,
    script_log: Vec<String>,
    script_values: Vec<(String, VecDeque<Value>)>,
    script_hooks: Vec<(String, ScriptHook)>,
}

impl std::fmt::Debug for PageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageState")
            .field("windows", &self.windows.keys().collect::<Vec<_>>())
            .field("current_window", &self.current_window)
            .field("current_frame", &self.current_frame)
            .finish_non_exhaustive()
    }
}

impl Default for PageState {
    fn default() -> Self {
        let mut windows = BTreeMap::new();
        windows.insert("main".to_string(), FakeWindow::with_default_content());
        Self {
            windows,
            current_window: "main".to_string(),
            current_frame: Vec::new(),
            script_log: Vec::new(),
            script_values: Vec::new(),
            script_hooks: Vec::new(),
        }
    }
}

impl PageState {
    /// Install an element under `window`/`frame` (frame `""` is the default
    /// content), keyed by its locator string.
    pub fn install_in(
        &mut self,
        window: &str,
        frame: &str,
        locator: impl Into<String>,
        element: FakeElement,
    ) {
        let window = self
            .windows
            .entry(window.to_string())
            .or_insert_with(FakeWindow::with_default_content);
        window
            .frames
            .entry(frame.to_string())
            .or_default()
            .elements
            .insert(locator.into(), element);
    }

    /// Remove an element again.
    pub fn remove_element(&mut self, window: &str, frame: &str, locator: &str) {
        if let Some(window) = self.windows.get_mut(window) {
            if let Some(frame) = window.frames.get_mut(frame) {
                frame.elements.remove(locator);
            }
        }
    }

    /// Open an additional window with empty default content.
    pub fn add_window(&mut self, name: impl Into<String>) {
        self.windows
            .entry(name.into())
            .or_insert_with(FakeWindow::with_default_content);
    }

    /// Register a frame (dotted path for nesting) in `window`.
    pub fn add_frame(&mut self, window: &str, frame_path: impl Into<String>) {
        let window = self
            .windows
            .entry(window.to_string())
            .or_insert_with(FakeWindow::with_default_content);
        window.frames.entry(frame_path.into()).or_default();
    }

    fn current_frame_key(&self) -> String {
        self.current_frame.join(".")
    }

    fn current_elements(&self) -> NavegarResult<&BTreeMap<String, FakeElement>> {
        let key = self.current_frame_key();
        self.windows
            .get(&self.current_window)
            .and_then(|w| w.frames.get(&key))
            .map(|f| &f.elements)
            .ok_or_else(|| NavegarError::driver("current context no longer exists"))
    }

    fn element_mut(&mut self, id: &str) -> NavegarResult<&mut FakeElement> {
        let key = self.current_frame_key();
        self.windows
            .get_mut(&self.current_window)
            .and_then(|w| w.frames.get_mut(&key))
            .and_then(|f| f.elements.get_mut(id))
            .ok_or_else(|| NavegarError::driver(format!("stale element: {id}")))
    }

    fn element(&self, id: &str) -> NavegarResult<&FakeElement> {
        self.current_elements()?
            .get(id)
            .ok_or_else(|| NavegarError::driver(format!("stale element: {id}")))
    }
}

/// In-memory [`Driver`] implementation.
pub struct FakeDriver {
    clock: SharedClock,
    state: Mutex<PageState>,
}

impl std::fmt::Debug for FakeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeDriver").finish_non_exhaustive()
    }
}

impl FakeDriver {
    /// Create a fake driver with one window (`main`) and empty content.
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            state: Mutex::new(PageState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Install an element into the main window's default content.
    pub fn install(&self, locator: impl Into<String>, element: FakeElement) {
        self.lock().install_in("main", "", locator, element);
    }

    /// Install an element under a specific window and frame.
    pub fn install_in(
        &self,
        window: &str,
        frame: &str,
        locator: impl Into<String>,
        element: FakeElement,
    ) {
        self.lock().install_in(window, frame, locator, element);
    }

    /// Open an additional window.
    pub fn add_window(&self, name: impl Into<String>) {
        self.lock().add_window(name);
    }

    /// Register a frame (dotted path for nesting).
    pub fn add_frame(&self, window: &str, frame_path: impl Into<String>) {
        self.lock().add_frame(window, frame_path);
    }

    /// Program a sequence of return values for scripts containing `needle`.
    /// The last value keeps being returned once the sequence is exhausted.
    pub fn when_script_values(&self, needle: impl Into<String>, values: Vec<Value>) {
        self.lock()
            .script_values
            .push((needle.into(), values.into_iter().collect()));
    }

    /// Register a side-effect hook for scripts containing `needle`.
    pub fn when_script(
        &self,
        needle: impl Into<String>,
        hook: impl FnMut(&mut PageState) + Send + 'static,
    ) {
        self.lock()
            .script_hooks
            .push((needle.into(), Box::new(hook)));
    }

    /// Every script evaluated so far, in order.
    #[must_use]
    pub fn script_log(&self) -> Vec<String> {
        self.lock().script_log.clone()
    }

    /// Value attribute of an element in the current context, for assertions.
    #[must_use]
    pub fn element_value(&self, locator: &str) -> Option<String> {
        let state = self.lock();
        state
            .current_elements()
            .ok()
            .and_then(|elements| elements.get(locator))
            .and_then(|element| element.attributes.get("value").cloned())
    }

    /// Click count of an element in the current context.
    #[must_use]
    pub fn clicks(&self, locator: &str) -> u32 {
        let state = self.lock();
        state
            .current_elements()
            .ok()
            .and_then(|elements| elements.get(locator))
            .map_or(0, |element| element.clicks)
    }

    fn appeared(&self, element: &FakeElement) -> bool {
        element.appear_at_ms <= self.clock.now_ms()
    }
}

impl Driver for FakeDriver {
    fn find_elements(&self, locator: &Locator) -> NavegarResult<Vec<ElementHandle>> {
        let state = self.lock();
        let elements = state.current_elements()?;
        Ok(elements
            .get(locator.raw())
            .filter(|element| self.appeared(element))
            .map(|element| vec![ElementHandle::new(locator.raw(), element.tag.clone())])
            .unwrap_or_default())
    }

    fn is_displayed(&self, element: &ElementHandle) -> NavegarResult<bool> {
        let state = self.lock();
        let found = state.element(&element.id)?;
        let hidden_now = found
            .hide_at_ms
            .is_some_and(|at| self.clock.now_ms() >= at);
        Ok(found.displayed && self.appeared(found) && !hidden_now)
    }

    fn is_enabled(&self, element: &ElementHandle) -> NavegarResult<bool> {
        Ok(self.lock().element(&element.id)?.enabled)
    }

    fn get_attribute(&self, element: &ElementHandle, name: &str) -> NavegarResult<Option<String>> {
        Ok(self.lock().element(&element.id)?.attributes.get(name).cloned())
    }

    fn get_text(&self, element: &ElementHandle) -> NavegarResult<String> {
        Ok(self.lock().element(&element.id)?.text.clone())
    }

    fn click(&self, element: &ElementHandle) -> NavegarResult<()> {
        let mut state = self.lock();
        let found = state.element_mut(&element.id)?;
        found.clicks += 1;
        let is_checkbox = found.tag == "input"
            && found.attributes.get("type").map(String::as_str) == Some("checkbox");
        if is_checkbox {
            if found.attributes.remove("checked").is_none() {
                found
                    .attributes
                    .insert("checked".to_string(), "true".to_string());
            }
        }
        Ok(())
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> NavegarResult<()> {
        let mut state = self.lock();
        let found = state.element_mut(&element.id)?;
        if found.selected_all {
            found
                .attributes
                .insert("value".to_string(), text.to_string());
            found.selected_all = false;
        } else {
            found
                .attributes
                .entry("value".to_string())
                .or_default()
                .push_str(text);
        }
        Ok(())
    }

    fn send_special(&self, element: &ElementHandle, keys: SpecialKeys) -> NavegarResult<()> {
        let mut state = self.lock();
        let found = state.element_mut(&element.id)?;
        match keys {
            SpecialKeys::SelectAll => found.selected_all = true,
            SpecialKeys::Delete => {
                if found.selected_all {
                    found.attributes.insert("value".to_string(), String::new());
                    found.selected_all = false;
                }
            }
            SpecialKeys::Enter => {}
        }
        Ok(())
    }

    fn clear(&self, element: &ElementHandle) -> NavegarResult<()> {
        let mut state = self.lock();
        let found = state.element_mut(&element.id)?;
        found.attributes.insert("value".to_string(), String::new());
        Ok(())
    }

    fn evaluate_script(&self, script: &str) -> NavegarResult<Value> {
        let mut state = self.lock();
        state.script_log.push(script.to_string());

        // Run side-effect hooks with the hook list detached, so hooks may
        // mutate the page model freely.
        let mut hooks = std::mem::take(&mut state.script_hooks);
        for (needle, hook) in &mut hooks {
            if script.contains(needle.as_str()) {
                hook(&mut state);
            }
        }
        hooks.append(&mut state.script_hooks);
        state.script_hooks = hooks;

        for (needle, values) in &mut state.script_values {
            if script.contains(needle.as_str()) {
                if let Some(front) = values.front().cloned() {
                    if values.len() > 1 {
                        values.pop_front();
                    }
                    return Ok(front);
                }
            }
        }
        Ok(Value::Null)
    }

    fn current_window_handle(&self) -> NavegarResult<WindowHandle> {
        Ok(WindowHandle(self.lock().current_window.clone()))
    }

    fn all_window_handles(&self) -> NavegarResult<Vec<WindowHandle>> {
        Ok(self
            .lock()
            .windows
            .keys()
            .cloned()
            .map(WindowHandle)
            .collect())
    }

    fn switch_to_window(&self, handle: &WindowHandle) -> NavegarResult<()> {
        let mut state = self.lock();
        if !state.windows.contains_key(handle.as_str()) {
            return Err(NavegarError::driver(format!("no such window: {handle}")));
        }
        state.current_window = handle.as_str().to_string();
        state.current_frame.clear();
        Ok(())
    }

    fn switch_to_frame(&self, name: &str) -> NavegarResult<()> {
        let mut state = self.lock();
        let mut path = state.current_frame.clone();
        path.push(name.to_string());
        let key = path.join(".");
        let exists = state
            .windows
            .get(&state.current_window)
            .is_some_and(|w| w.frames.contains_key(&key));
        if !exists {
            return Err(NavegarError::driver(format!("no such frame: {key}")));
        }
        state.current_frame = path;
        Ok(())
    }

    fn switch_to_default_content(&self) -> NavegarResult<()> {
        self.lock().current_frame.clear();
        Ok(())
    }

    fn current_url(&self) -> NavegarResult<String> {
        let state = self.lock();
        state
            .windows
            .get(&state.current_window)
            .map(|w| w.url.clone())
            .ok_or_else(|| NavegarError::driver("current window no longer exists"))
    }

    fn navigate_to(&self, url: &str) -> NavegarResult<()> {
        let mut state = self.lock();
        let current = state.current_window.clone();
        match state.windows.get_mut(&current) {
            Some(window) => {
                window.url = url.to_string();
                Ok(())
            }
            None => Err(NavegarError::driver("current window no longer exists")),
        }
    }
}
