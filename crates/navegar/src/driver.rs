//! External browser-control driver interface.
//!
//! The engine does not implement a browser, a DOM, or script evaluation. It
//! assumes only an external driver capable of element queries, script
//! execution, and window/frame control, expressed as the synchronous
//! [`Driver`] trait below. Keeping the trait abstract protects the engine
//! from backend instability: any WebDriver- or CDP-style implementation can
//! be plugged in, and tests run against the in-memory
//! [`FakeDriver`](crate::mock::FakeDriver).
//!
//! All calls block until the driver answers; there is no internal
//! parallelism anywhere above this trait.

use crate::locator::Locator;
use crate::result::NavegarResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Handle to a concrete DOM element.
///
/// Valid only within the window/frame context it was resolved in; a context
/// switch invalidates previously resolved handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned identifier for the element
    pub id: String,
    /// Element tag name, lowercase
    pub tag_name: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
        }
    }
}

/// Handle to a top-level browser window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub String);

impl WindowHandle {
    /// The raw driver handle string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-character key sequences.
///
/// Used by the clearing strategies: no single clearing technique behaves
/// consistently across all rendered field types, so some widgets are cleared
/// with a select-all-then-delete sequence instead of a native clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialKeys {
    /// Select the whole field content (Ctrl+A)
    SelectAll,
    /// Delete the current selection
    Delete,
    /// Confirm / commit (Enter)
    Enter,
}

/// Synchronous browser-control driver.
///
/// Every method acts against the driver's current window/frame context;
/// context is managed above this trait by
/// [`BrowserSession`](crate::session::BrowserSession).
pub trait Driver: Send + Sync + std::fmt::Debug {
    /// Find all elements matching `locator` in the current context.
    /// Zero or one match is expected for the engine's usage.
    fn find_elements(&self, locator: &Locator) -> NavegarResult<Vec<ElementHandle>>;

    /// Whether the element is currently displayed.
    fn is_displayed(&self, element: &ElementHandle) -> NavegarResult<bool>;

    /// Whether the element is enabled for interaction.
    fn is_enabled(&self, element: &ElementHandle) -> NavegarResult<bool>;

    /// Read an attribute; `None` when the attribute is absent.
    fn get_attribute(&self, element: &ElementHandle, name: &str) -> NavegarResult<Option<String>>;

    /// Visible text content of the element.
    fn get_text(&self, element: &ElementHandle) -> NavegarResult<String>;

    /// Native click on the element.
    fn click(&self, element: &ElementHandle) -> NavegarResult<()>;

    /// Type `text` into the element.
    fn send_keys(&self, element: &ElementHandle, text: &str) -> NavegarResult<()>;

    /// Send a special key sequence to the element.
    fn send_special(&self, element: &ElementHandle, keys: SpecialKeys) -> NavegarResult<()>;

    /// Native clear of the element's value.
    fn clear(&self, element: &ElementHandle) -> NavegarResult<()>;

    /// Evaluate a script in the current context and return its value.
    fn evaluate_script(&self, script: &str) -> NavegarResult<Value>;

    /// Handle of the window the driver is currently addressing.
    fn current_window_handle(&self) -> NavegarResult<WindowHandle>;

    /// Handles of all open windows.
    fn all_window_handles(&self) -> NavegarResult<Vec<WindowHandle>>;

    /// Switch the driver to the given window.
    fn switch_to_window(&self, handle: &WindowHandle) -> NavegarResult<()>;

    /// Switch into a frame by name, relative to the current context.
    fn switch_to_frame(&self, name: &str) -> NavegarResult<()>;

    /// Reset the driver to the default content of the current window.
    fn switch_to_default_content(&self) -> NavegarResult<()>;

    /// URL of the current window.
    fn current_url(&self) -> NavegarResult<String>;

    /// Navigate the current window to `url`.
    fn navigate_to(&self, url: &str) -> NavegarResult<()>;
}

/// Shared driver handle
pub type SharedDriver = Arc<dyn Driver>;
