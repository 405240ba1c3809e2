//! Three-level menu navigation state machine.
//!
//! Screens are opened through a script-rendered dropdown nested three
//! levels deep (application, category, screen). Menu items carry no stable
//! identifier, so each level is found by a linear scan over 1-based
//! structural indices, comparing display text case-insensitively. The
//! passive hover events a human would trigger are unreliable to simulate,
//! so a matched level's submenu is forced visible by a side-effecting
//! script call instead, and the level-3 item is clicked by script for the
//! same reason.
//!
//! A failed traversal is "screen not found", reported as `Ok(None)` with
//! the session returned to the main window; it is not an error.

use crate::config::MenuConfig;
use crate::driver::{ElementHandle};
use crate::locator::{Locator, LocatorTemplate};
use crate::result::{NavegarError, NavegarResult};
use crate::session::BrowserSession;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Target of a menu traversal: one name per nesting level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuPath {
    application: String,
    category: String,
    screen: String,
}

impl MenuPath {
    /// Build a menu path from the three level names.
    ///
    /// # Errors
    ///
    /// Returns [`NavegarError::InvalidArgument`] when any name is empty.
    pub fn new(
        application: impl Into<String>,
        category: impl Into<String>,
        screen: impl Into<String>,
    ) -> NavegarResult<Self> {
        let path = Self {
            application: application.into(),
            category: category.into(),
            screen: screen.into(),
        };
        if path.application.trim().is_empty()
            || path.category.trim().is_empty()
            || path.screen.trim().is_empty()
        {
            return Err(NavegarError::invalid_argument(
                "menu path names must not be empty",
            ));
        }
        Ok(path)
    }

    /// Level-1 application name.
    #[must_use]
    pub fn application(&self) -> &str {
        &self.application
    }

    /// Level-2 category name.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Level-3 screen name.
    #[must_use]
    pub fn screen(&self) -> &str {
        &self.screen
    }
}

impl std::fmt::Display for MenuPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} > {} > {}", self.application, self.category, self.screen)
    }
}

/// A screen opened by a successful traversal.
///
/// `id` is freshly generated per navigation; `screen` is stable across
/// repeated navigations to the same target, so callers can verify that a
/// re-navigation landed on the same screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenScreen {
    /// Opaque identifier of this opening
    pub id: Uuid,
    /// Normalized screen name (lowercased display text)
    pub screen: String,
    /// Locator of the content frame element backing the screen
    pub frame_locator: Locator,
}

/// Drives the three-level traversal over a session.
#[derive(Debug)]
pub struct MenuNavigator<'s> {
    session: &'s mut BrowserSession,
    config: MenuConfig,
    failure: Option<NavegarError>,
}

impl<'s> MenuNavigator<'s> {
    /// Create a navigator over a session.
    #[must_use]
    pub fn new(session: &'s mut BrowserSession, config: MenuConfig) -> Self {
        Self {
            session,
            config,
            failure: None,
        }
    }

    /// Traverse application, category, and screen and open the target.
    ///
    /// On success the session is switched into the screen's content frame
    /// and the opened screen is returned. The blocking-overlay barrier is
    /// re-checked before each level scan, so no item locator is
    /// dereferenced while the loading indicator is displayed. When any
    /// level scan exhausts without a text match, the overlay never clears,
    /// or the content frame never appears, the forced-visibility styles
    /// are torn down, the session returns to the main window, and
    /// `Ok(None)` is reported.
    ///
    /// # Errors
    ///
    /// Only configuration problems (malformed locator templates) surface
    /// as errors; "screen not found" is `Ok(None)`.
    pub fn navigate(&mut self, path: &MenuPath) -> NavegarResult<Option<OpenScreen>> {
        debug!(target = %path, "menu traversal start");
        self.failure = None;
        if !self.session.switch_to_main_window() {
            warn!("main window unreachable, aborting traversal");
            return Ok(None);
        }
        if let Some(stall) = self.overlay_stalled() {
            return Ok(self.abort(stall));
        }

        let level1 = LocatorTemplate::new(&self.config.level1_item);
        let Some(index1) = self.scan_level(&level1, 1, path.application(), None, None)? else {
            return Ok(self.abort(NavegarError::MenuLevelNotFound {
                level: 1,
                name: path.application().to_string(),
            }));
        };
        self.run_script(&LocatorTemplate::new(&self.config.level1_show_script).render(index1));
        if let Some(stall) = self.overlay_stalled() {
            return Ok(self.abort(stall));
        }

        let level2 = LocatorTemplate::new(&self.config.level2_item);
        let Some(index2) = self.scan_level(
            &level2,
            1,
            path.category(),
            Some(self.config.level2_label_suffix.as_str()),
            None,
        )?
        else {
            return Ok(self.abort(NavegarError::MenuLevelNotFound {
                level: 2,
                name: path.category().to_string(),
            }));
        };
        self.run_script(&LocatorTemplate::new(&self.config.level2_show_script).render(index2));
        if let Some(stall) = self.overlay_stalled() {
            return Ok(self.abort(stall));
        }

        let level3 = LocatorTemplate::new(&self.config.level3_item);
        let Some(index3) = self.scan_level(
            &level3,
            self.config.level3_start_index,
            path.screen(),
            None,
            Some(self.config.subheading_class.as_str()),
        )?
        else {
            return Ok(self.abort(NavegarError::MenuLevelNotFound {
                level: 3,
                name: path.screen().to_string(),
            }));
        };

        // The rendered handler only fires reliably through the scripted
        // event path, so the click is issued by script, the forced
        // visibility is torn down, and a short settle pause covers the
        // menu overlay's teardown animation.
        self.run_script(&LocatorTemplate::new(&self.config.level3_click_script).render(index3));
        let teardown = self.config.clear_visibility_script.clone();
        self.run_script(&teardown);
        self.session.sync().pause(self.config.post_click_pause());

        if let Some(stall) = self.overlay_stalled() {
            return Ok(self.abort(stall));
        }
        let frame_locator = Locator::parse(&self.config.content_frame_locator)?;
        self.check_frame_address(&frame_locator);
        let frame_name = self.config.content_frame_name.clone();
        if !self
            .session
            .switch_to_frame_when_present(&frame_name, self.config.item_wait_timeout())
        {
            return Ok(self.abort(NavegarError::ContextSwitchFailed { target: frame_name }));
        }

        let opened = OpenScreen {
            id: Uuid::new_v4(),
            screen: path.screen().trim().to_lowercase(),
            frame_locator,
        };
        debug!(target = %path, id = %opened.id, "menu traversal complete");
        Ok(Some(opened))
    }

    /// Like [`Self::navigate`], for callers that demand the screen to
    /// exist: a failed traversal becomes the error recorded at the failing
    /// stage instead of `None`.
    ///
    /// # Errors
    ///
    /// [`NavegarError::MenuLevelNotFound`] when a level scan exhausted,
    /// [`NavegarError::ContextSwitchFailed`] when the content frame never
    /// became switchable, [`NavegarError::Timeout`] when the blocking
    /// overlay never cleared, plus any configuration problem `navigate`
    /// itself reports.
    pub fn navigate_required(&mut self, path: &MenuPath) -> NavegarResult<OpenScreen> {
        match self.navigate(path)? {
            Some(opened) => Ok(opened),
            None => Err(self.failure.take().unwrap_or_else(|| {
                NavegarError::MenuLevelNotFound {
                    level: 1,
                    name: path.application().to_string(),
                }
            })),
        }
    }

    /// Run the blocking-overlay barrier. The show scripts render their
    /// submenus over background calls and can raise the loading indicator
    /// mid-traversal, so this is re-checked before every level scan, not
    /// just once at the start.
    fn overlay_stalled(&self) -> Option<NavegarError> {
        if self.session.sync().wait_for_no_blocking_overlay() {
            return None;
        }
        let config = self.session.sync().config();
        let overlay_wait_ms =
            u64::from(config.overlay_poll_limit) * config.overlay_poll_interval_ms;
        Some(NavegarError::Timeout { ms: overlay_wait_ms })
    }

    /// Linear scan of one level, starting at `start`.
    ///
    /// Returns the 1-based index of the first item whose display text
    /// matches `target` case-insensitively, or `None` when no element
    /// exists at the next index before a match was found. Items whose
    /// class attribute carries `skip_class` are advanced past without
    /// comparison. When `label_suffix` is given, the text is read from the
    /// nested label element if one exists.
    fn scan_level(
        &self,
        template: &LocatorTemplate,
        start: usize,
        target: &str,
        label_suffix: Option<&str>,
        skip_class: Option<&str>,
    ) -> NavegarResult<Option<usize>> {
        let sync = self.session.sync().clone();
        let first = template.at(start)?;
        if !sync.wait_for_visible_and_present(
            &first,
            self.config.item_wait_timeout(),
            sync.config().poll_interval(),
        ) {
            debug!(locator = %first, "level's first item never became interactable");
            return Ok(None);
        }

        let mut index = start;
        loop {
            let item = template.at(index)?;
            let Some(handle) = self.find(&item) else {
                trace!(index, "scan exhausted");
                return Ok(None);
            };
            if let Some(marker) = skip_class {
                if self.has_class(&handle, marker) {
                    trace!(index, "skipping sub-heading row");
                    index += 1;
                    continue;
                }
            }
            let text = self.display_text(&item, &handle, label_suffix)?;
            if text.trim().eq_ignore_ascii_case(target.trim()) {
                trace!(index, text, "level matched");
                return Ok(Some(index));
            }
            index += 1;
        }
    }

    /// Read the item's display text, preferring the nested label element
    /// when the level carries one.
    fn display_text(
        &self,
        item: &Locator,
        handle: &ElementHandle,
        label_suffix: Option<&str>,
    ) -> NavegarResult<String> {
        if let Some(suffix) = label_suffix {
            let label = item.with_suffix(suffix)?;
            if let Some(inner) = self.find(&label) {
                if let Ok(text) = self.session.driver().get_text(&inner) {
                    return Ok(text);
                }
            }
        }
        Ok(self.session.driver().get_text(handle).unwrap_or_default())
    }

    fn has_class(&self, handle: &ElementHandle, marker: &str) -> bool {
        self.session
            .driver()
            .get_attribute(handle, "class")
            .ok()
            .flatten()
            .is_some_and(|class| class.split_whitespace().any(|c| c == marker))
    }

    /// Compare the content frame's address attribute for diagnostics. A
    /// frame element lacking the attribute is accepted with a warning, as
    /// some screen generations render the frame before assigning it.
    fn check_frame_address(&self, frame_locator: &Locator) {
        let Some(handle) = self.find(frame_locator) else {
            return;
        };
        match self
            .session
            .driver()
            .get_attribute(&handle, &self.config.screen_address_attribute)
        {
            Ok(Some(address)) => trace!(%address, "content frame address"),
            Ok(None) => warn!(
                attribute = self.config.screen_address_attribute,
                "content frame has no address attribute"
            ),
            Err(err) => trace!(%err, "content frame address read failed"),
        }
    }

    fn find(&self, locator: &Locator) -> Option<ElementHandle> {
        self.session
            .driver()
            .find_elements(locator)
            .ok()
            .and_then(|found| found.into_iter().next())
    }

    fn run_script(&self, script: &str) {
        if let Err(err) = self.session.driver().evaluate_script(script) {
            warn!(script, %err, "menu script failed");
        }
    }

    /// Tear down any forced-visibility styles, return to the main window,
    /// and remember why the traversal failed. Always yields `None` so
    /// failure paths read as one line.
    fn abort(&mut self, failure: NavegarError) -> Option<OpenScreen> {
        debug!(%failure, "menu traversal failed");
        let teardown = self.config.clear_visibility_script.clone();
        self.run_script(&teardown);
        self.session.switch_to_main_window();
        self.failure = Some(failure);
        None
    }
}
