//! Engine configuration.
//!
//! Every timing constant and structural locator template the engine relies
//! on lives here, so deployments can adapt to a differently rendered
//! application without code changes. Defaults reproduce the reference
//! behavior (overlay ceiling of 120 polls at one-second spacing, level-3
//! menu scan starting at index 2, and so on).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default engine-wide timeout for implicit waits (30 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Timing and probe configuration for the synchronization engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Engine-wide timeout for implicit waits, in milliseconds
    pub default_timeout_ms: u64,
    /// Polling interval for wait loops, in milliseconds
    pub poll_interval_ms: u64,
    /// Locator of the page-blocking loading indicator
    pub overlay_locator: String,
    /// Maximum number of polls while the overlay is displayed
    pub overlay_poll_limit: u32,
    /// Spacing between overlay polls, in milliseconds
    pub overlay_poll_interval_ms: u64,
    /// Script probe that evaluates to `true` when no asynchronous network
    /// activity is outstanding
    pub async_probe_script: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            overlay_locator: "//div[@id='loading-indicator']".to_string(),
            overlay_poll_limit: 120,
            overlay_poll_interval_ms: 1_000,
            async_probe_script:
                "return (typeof jQuery === 'undefined') || jQuery.active === 0;".to_string(),
        }
    }
}

impl SyncConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine-wide implicit wait timeout
    #[must_use]
    pub fn with_default_timeout(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Set the blocking overlay locator
    #[must_use]
    pub fn with_overlay_locator(mut self, locator: impl Into<String>) -> Self {
        self.overlay_locator = locator.into();
        self
    }

    /// Set the overlay poll ceiling and spacing
    #[must_use]
    pub fn with_overlay_polling(mut self, limit: u32, interval_ms: u64) -> Self {
        self.overlay_poll_limit = limit;
        self.overlay_poll_interval_ms = interval_ms;
        self
    }

    /// Set the asynchronous-work probe script
    #[must_use]
    pub fn with_async_probe_script(mut self, script: impl Into<String>) -> Self {
        self.async_probe_script = script.into();
        self
    }

    /// Engine-wide implicit wait timeout as a Duration
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Polling interval as a Duration
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Overlay poll spacing as a Duration
    #[must_use]
    pub fn overlay_poll_interval(&self) -> Duration {
        Duration::from_millis(self.overlay_poll_interval_ms)
    }
}

/// Structural templates and timing for the three-level menu traversal.
///
/// Templates use `{}` as the 1-based structural index placeholder; see
/// [`LocatorTemplate`](crate::locator::LocatorTemplate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuConfig {
    /// Level-1 (application) item locator template
    pub level1_item: String,
    /// Level-2 (category) item locator template
    pub level2_item: String,
    /// Level-3 (screen) item locator template
    pub level3_item: String,
    /// Suffix locating the nested label span inside a level-2 item
    pub level2_label_suffix: String,
    /// Structural index the level-3 scan starts at (position 1 is a
    /// non-clickable heading)
    pub level3_start_index: usize,
    /// Class attribute marker of non-clickable sub-heading rows
    pub subheading_class: String,
    /// Script template that forces the matched level-1 submenu visible
    pub level1_show_script: String,
    /// Script template that forces the matched level-2 submenu visible
    pub level2_show_script: String,
    /// Script template that clicks the matched level-3 item
    pub level3_click_script: String,
    /// Script that clears every forced-visibility style again
    pub clear_visibility_script: String,
    /// Locator of the content frame element backing an opened screen
    pub content_frame_locator: String,
    /// Frame name used to switch into the opened screen's content
    pub content_frame_name: String,
    /// Frame element attribute carrying the screen's address
    pub screen_address_attribute: String,
    /// Wait for a level's first item to become interactable, in milliseconds
    pub item_wait_timeout_ms: u64,
    /// Settle pause after the level-3 click, in milliseconds
    pub post_click_pause_ms: u64,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            level1_item: "//div[@id='menubar']/span[{}]".to_string(),
            level2_item: "//div[@id='menubar']/div[@class='categories']/span[{}]".to_string(),
            level3_item: "//div[@id='menubar']/div[@class='screens']/a[{}]".to_string(),
            level2_label_suffix: "/span".to_string(),
            level3_start_index: 2,
            subheading_class: "menu-subheading".to_string(),
            level1_show_script: "navShowApplicationMenu({});".to_string(),
            level2_show_script: "navShowCategoryMenu({});".to_string(),
            level3_click_script: "navClickScreenItem({});".to_string(),
            clear_visibility_script: "navClearForcedMenus();".to_string(),
            content_frame_locator: "//iframe[@name='contentFrame']".to_string(),
            content_frame_name: "contentFrame".to_string(),
            screen_address_attribute: "src".to_string(),
            item_wait_timeout_ms: 10_000,
            post_click_pause_ms: 250,
        }
    }
}

impl MenuConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the three level item templates
    #[must_use]
    pub fn with_level_items(
        mut self,
        level1: impl Into<String>,
        level2: impl Into<String>,
        level3: impl Into<String>,
    ) -> Self {
        self.level1_item = level1.into();
        self.level2_item = level2.into();
        self.level3_item = level3.into();
        self
    }

    /// Set the level-3 scan start index
    #[must_use]
    pub fn with_level3_start_index(mut self, index: usize) -> Self {
        self.level3_start_index = index;
        self
    }

    /// Set the sub-heading class marker
    #[must_use]
    pub fn with_subheading_class(mut self, class: impl Into<String>) -> Self {
        self.subheading_class = class.into();
        self
    }

    /// Set the content frame locator and switch name
    #[must_use]
    pub fn with_content_frame(
        mut self,
        locator: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.content_frame_locator = locator.into();
        self.content_frame_name = name.into();
        self
    }

    /// Set the settle pause after the level-3 click
    #[must_use]
    pub fn with_post_click_pause(mut self, pause_ms: u64) -> Self {
        self.post_click_pause_ms = pause_ms;
        self
    }

    /// Settle pause as a Duration
    #[must_use]
    pub fn post_click_pause(&self) -> Duration {
        Duration::from_millis(self.post_click_pause_ms)
    }

    /// Item interactability wait as a Duration
    #[must_use]
    pub fn item_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.item_wait_timeout_ms)
    }
}

/// Configuration for the action facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Script template assigning an empty value to the field addressed by a
    /// path-expression locator (`{}` placeholder). Used by the script-assign
    /// clearing strategy for field types where neither a native clear nor a
    /// key sequence removes the formatted content.
    pub clear_value_script: String,
    /// Timeout for the async barrier issued after selection actions,
    /// in milliseconds
    pub select_settle_timeout_ms: u64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            clear_value_script: "navAssignValue(\"{}\", '');".to_string(),
            select_settle_timeout_ms: 15_000,
        }
    }
}

impl ActionConfig {
    /// Async barrier timeout as a Duration
    #[must_use]
    pub fn select_settle_timeout(&self) -> Duration {
        Duration::from_millis(self.select_settle_timeout_ms)
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Synchronization engine settings
    pub sync: SyncConfig,
    /// Menu traversal settings
    pub menu: MenuConfig,
    /// Action facade settings
    pub actions: ActionConfig,
}

impl EngineConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the synchronization settings
    #[must_use]
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// Replace the menu settings
    #[must_use]
    pub fn with_menu(mut self, menu: MenuConfig) -> Self {
        self.menu = menu;
        self
    }

    /// Replace the action settings
    #[must_use]
    pub fn with_actions(mut self, actions: ActionConfig) -> Self {
        self.actions = actions;
        self
    }
}
