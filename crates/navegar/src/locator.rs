//! Locator classification, templates, and resolution.
//!
//! Locators stay opaque strings with a light syntax tag: `//…` denotes a
//! path expression, `css=…` an alternate selector (prefix stripped when
//! handed to the driver), anything else a plain identifier. Structural
//! lookups additionally carry an ordered [`CandidateSet`] of suffix
//! templates, because the same logical field renders differently depending
//! on editability, cell type, and screen generation.
//!
//! Index-addressed locators (menu items have no stable identifier) are
//! built through [`LocatorTemplate`], keeping the index arithmetic
//! unit-testable away from any live DOM.

use crate::driver::{ElementHandle, SharedDriver};
use crate::result::{NavegarError, NavegarResult};
use crate::sync::SyncEngine;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Ceiling on accepted locator length, in bytes.
pub const MAX_LOCATOR_LENGTH: usize = 10 * 1024;

/// Syntax family of a locator string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntaxKind {
    /// Plain identifier lookup (element id or name)
    Identifier,
    /// XPath-style path expression, starting with `//`
    PathExpression,
    /// CSS selector carried behind a `css=` prefix
    AlternateSelector,
}

/// Classify a locator string by its literal prefix.
///
/// Pure and total: every string maps to exactly one [`SyntaxKind`], and no
/// driver call is involved.
#[must_use]
pub fn classify(locator: &str) -> SyntaxKind {
    if locator.starts_with("//") {
        SyntaxKind::PathExpression
    } else if locator.starts_with("css=") {
        SyntaxKind::AlternateSelector
    } else {
        SyntaxKind::Identifier
    }
}

/// A validated, immutable locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    raw: String,
    kind: SyntaxKind,
}

impl Locator {
    /// Parse a locator string.
    ///
    /// # Errors
    ///
    /// Returns [`NavegarError::InvalidArgument`] for empty or
    /// whitespace-only strings and for selectors above
    /// [`MAX_LOCATOR_LENGTH`].
    pub fn parse(raw: impl Into<String>) -> NavegarResult<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(NavegarError::invalid_argument("locator must not be empty"));
        }
        if raw.len() > MAX_LOCATOR_LENGTH {
            return Err(NavegarError::invalid_argument(format!(
                "locator exceeds {MAX_LOCATOR_LENGTH} bytes"
            )));
        }
        let kind = classify(&raw);
        Ok(Self { raw, kind })
    }

    /// The locator string exactly as supplied.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The syntax family.
    #[must_use]
    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    /// The selector as handed to the driver: for an alternate selector the
    /// `css=` tag is stripped, everything else passes through unchanged.
    #[must_use]
    pub fn selector(&self) -> &str {
        match self.kind {
            SyntaxKind::AlternateSelector => self.raw.trim_start_matches("css="),
            _ => &self.raw,
        }
    }

    /// Append a structural suffix, producing a new locator.
    ///
    /// An empty suffix is the identity candidate and returns a clone.
    ///
    /// # Errors
    ///
    /// Returns [`NavegarError::InvalidArgument`] when the combined string
    /// exceeds [`MAX_LOCATOR_LENGTH`].
    pub fn with_suffix(&self, suffix: &str) -> NavegarResult<Self> {
        if suffix.is_empty() {
            return Ok(self.clone());
        }
        Self::parse(format!("{}{suffix}", self.raw))
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Locator or script template with a single `{}` placeholder.
///
/// Menu traversal rebuilds locators from a structural index on every scan
/// step; the substitution lives here so off-by-one behavior (the level-3
/// scan starting at index 2, rows skipped past) is testable in isolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorTemplate {
    template: String,
}

impl LocatorTemplate {
    /// Wrap a template string. The placeholder is optional; a template
    /// without one renders unchanged.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render the template with a 1-based structural index.
    #[must_use]
    pub fn render(&self, index: usize) -> String {
        self.fill(&index.to_string())
    }

    /// Render the template with an arbitrary replacement value.
    #[must_use]
    pub fn fill(&self, value: &str) -> String {
        self.template.replacen("{}", value, 1)
    }

    /// Render with an index and parse the result as a [`Locator`].
    ///
    /// # Errors
    ///
    /// Propagates [`Locator::parse`] failures.
    pub fn at(&self, index: usize) -> NavegarResult<Locator> {
        Locator::parse(self.render(index))
    }
}

/// Ordered structural candidate suffixes for one logical field.
///
/// Order encodes priority: more specific structural shapes first, the
/// identity suffix last as a fallback for non-editable text. Trial is
/// strictly ordered and stops at the first candidate that resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSet {
    suffixes: Vec<String>,
}

impl CandidateSet {
    /// Build a candidate set from ordered suffixes.
    ///
    /// # Errors
    ///
    /// Returns [`NavegarError::InvalidArgument`] when `suffixes` is empty.
    pub fn new<I, S>(suffixes: I) -> NavegarResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let suffixes: Vec<String> = suffixes.into_iter().map(Into::into).collect();
        if suffixes.is_empty() {
            return Err(NavegarError::invalid_argument(
                "candidate set must not be empty",
            ));
        }
        Ok(Self { suffixes })
    }

    /// The structural shapes a table cell can take: a doubly nested input,
    /// a singly nested input, a bare input, and finally the cell itself for
    /// non-editable text.
    #[must_use]
    pub fn table_cell() -> Self {
        Self {
            suffixes: vec![
                "/span/span/input[2]".to_string(),
                "/span/span/input".to_string(),
                "/input".to_string(),
                String::new(),
            ],
        }
    }

    /// The suffixes in trial order.
    #[must_use]
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.suffixes.len()
    }

    /// Whether the set holds no candidates. Construction forbids this, so
    /// only a deserialized set can be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }
}

/// Turns locators into concrete element handles.
///
/// Every resolution first passes the blocking-overlay barrier; no locator
/// is dereferenced against a page mid-refresh. That ordering is a hard
/// precondition of every driver read issued here.
#[derive(Debug, Clone)]
pub struct Resolver {
    driver: SharedDriver,
    sync: SyncEngine,
}

impl Resolver {
    /// Create a resolver over a driver and its synchronization engine.
    #[must_use]
    pub fn new(driver: SharedDriver, sync: SyncEngine) -> Self {
        Self { driver, sync }
    }

    /// The synchronization engine resolutions are gated on.
    #[must_use]
    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    /// Resolve a locator to exactly one element.
    ///
    /// With `implicit_wait`, the call blocks (bounded by the engine-wide
    /// default timeout) until the element appears; without it, the query is
    /// issued once and fails fast.
    ///
    /// # Errors
    ///
    /// [`NavegarError::Timeout`] when the blocking overlay never clears,
    /// [`NavegarError::NotFound`] when no element matches within the
    /// applicable wait.
    pub fn resolve_one(&self, locator: &Locator, implicit_wait: bool) -> NavegarResult<ElementHandle> {
        self.overlay_barrier()?;
        if implicit_wait {
            let config = self.sync.config();
            let appeared =
                self.sync
                    .wait_for_presence(locator, config.default_timeout(), config.poll_interval());
            if !appeared {
                debug!(%locator, "element never appeared within implicit wait");
                return Err(NavegarError::NotFound {
                    locator: locator.raw().to_string(),
                });
            }
        }
        self.find_now(locator)?.ok_or_else(|| NavegarError::NotFound {
            locator: locator.raw().to_string(),
        })
    }

    /// Try each candidate suffix under `base` in order and return the first
    /// element that resolves, together with the zero-based index of the
    /// matching candidate.
    ///
    /// Callers must not assume which candidate matched; the index is
    /// reported for diagnostics, not for dispatch.
    ///
    /// # Errors
    ///
    /// [`NavegarError::Timeout`] when the blocking overlay never clears,
    /// [`NavegarError::NoCandidateMatched`] when every candidate misses.
    pub fn resolve_first_of(
        &self,
        candidates: &CandidateSet,
        base: &Locator,
    ) -> NavegarResult<(ElementHandle, usize)> {
        self.overlay_barrier()?;
        for (index, suffix) in candidates.suffixes().iter().enumerate() {
            let candidate = base.with_suffix(suffix)?;
            if let Some(handle) = self.find_now(&candidate)? {
                trace!(%candidate, index, "structural candidate matched");
                return Ok((handle, index));
            }
        }
        Err(NavegarError::NoCandidateMatched {
            base: base.raw().to_string(),
            tried: candidates.len(),
        })
    }

    fn overlay_barrier(&self) -> NavegarResult<()> {
        if self.sync.wait_for_no_blocking_overlay() {
            Ok(())
        } else {
            let config = self.sync.config();
            Err(NavegarError::Timeout {
                ms: u64::from(config.overlay_poll_limit) * config.overlay_poll_interval_ms,
            })
        }
    }

    fn find_now(&self, locator: &Locator) -> NavegarResult<Option<ElementHandle>> {
        Ok(self.driver.find_elements(locator)?.into_iter().next())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::{Clock, TestClock};
    use crate::config::SyncConfig;
    use crate::mock::{FakeDriver, FakeElement};
    use proptest::prelude::*;
    use std::sync::Arc;

    mod classify_tests {
        use super::*;

        #[test]
        fn test_path_expression() {
            assert_eq!(classify("//a/b"), SyntaxKind::PathExpression);
        }

        #[test]
        fn test_alternate_selector() {
            assert_eq!(classify("css=.x"), SyntaxKind::AlternateSelector);
        }

        #[test]
        fn test_identifier() {
            assert_eq!(classify("field1"), SyntaxKind::Identifier);
        }

        #[test]
        fn test_single_slash_is_identifier() {
            assert_eq!(classify("/input"), SyntaxKind::Identifier);
        }

        proptest! {
            #[test]
            fn test_total_over_arbitrary_strings(s in ".*") {
                // Never panics, and the three families partition all inputs.
                let kind = classify(&s);
                let expected = if s.starts_with("//") {
                    SyntaxKind::PathExpression
                } else if s.starts_with("css=") {
                    SyntaxKind::AlternateSelector
                } else {
                    SyntaxKind::Identifier
                };
                prop_assert_eq!(kind, expected);
            }
        }
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_rejects_empty() {
            assert!(matches!(
                Locator::parse(""),
                Err(NavegarError::InvalidArgument { .. })
            ));
        }

        #[test]
        fn test_rejects_whitespace_only() {
            assert!(matches!(
                Locator::parse("   \t"),
                Err(NavegarError::InvalidArgument { .. })
            ));
        }

        #[test]
        fn test_rejects_oversized() {
            let huge = "x".repeat(MAX_LOCATOR_LENGTH + 1);
            assert!(matches!(
                Locator::parse(huge),
                Err(NavegarError::InvalidArgument { .. })
            ));
        }

        #[test]
        fn test_selector_strips_css_tag() {
            let locator = Locator::parse("css=.menu > a").unwrap();
            assert_eq!(locator.kind(), SyntaxKind::AlternateSelector);
            assert_eq!(locator.selector(), ".menu > a");
            assert_eq!(locator.raw(), "css=.menu > a");
        }

        #[test]
        fn test_with_suffix_appends() {
            let base = Locator::parse("//td[3]").unwrap();
            let nested = base.with_suffix("/input").unwrap();
            assert_eq!(nested.raw(), "//td[3]/input");
            assert_eq!(nested.kind(), SyntaxKind::PathExpression);
        }

        #[test]
        fn test_with_empty_suffix_is_identity() {
            let base = Locator::parse("//td[3]").unwrap();
            assert_eq!(base.with_suffix("").unwrap(), base);
        }
    }

    mod template_tests {
        use super::*;

        #[test]
        fn test_render_substitutes_index() {
            let template = LocatorTemplate::new("//div[@id='menubar']/span[{}]");
            assert_eq!(template.render(3), "//div[@id='menubar']/span[3]");
        }

        #[test]
        fn test_only_first_placeholder_is_substituted() {
            let template = LocatorTemplate::new("//a[{}]/b[{}]");
            assert_eq!(template.render(1), "//a[1]/b[{}]");
        }

        #[test]
        fn test_fill_with_string() {
            let template = LocatorTemplate::new("navAssignValue(\"{}\", '');");
            assert_eq!(
                template.fill("//td[3]/input"),
                "navAssignValue(\"//td[3]/input\", '');"
            );
        }

        #[test]
        fn test_at_parses_rendered_locator() {
            let template = LocatorTemplate::new("//span[{}]");
            let locator = template.at(2).unwrap();
            assert_eq!(locator.raw(), "//span[2]");
        }
    }

    mod candidate_set_tests {
        use super::*;

        #[test]
        fn test_rejects_empty_set() {
            let none: Vec<String> = Vec::new();
            assert!(matches!(
                CandidateSet::new(none),
                Err(NavegarError::InvalidArgument { .. })
            ));
        }

        #[test]
        fn test_table_cell_ends_with_identity() {
            let set = CandidateSet::table_cell();
            assert_eq!(set.suffixes().last().map(String::as_str), Some(""));
        }
    }

    mod resolver_tests {
        use super::*;

        fn resolver() -> (Arc<TestClock>, Arc<FakeDriver>, Resolver) {
            let clock = Arc::new(TestClock::new());
            let driver = Arc::new(FakeDriver::new(clock.clone()));
            let sync = SyncEngine::new(
                driver.clone(),
                clock.clone(),
                SyncConfig::new()
                    .with_default_timeout(1_000)
                    .with_poll_interval(100)
                    .with_overlay_polling(5, 100),
            );
            let resolver = Resolver::new(driver.clone(), sync);
            (clock, driver, resolver)
        }

        #[test]
        fn test_resolve_one_immediate() {
            let (_, driver, resolver) = resolver();
            driver.install("field1", FakeElement::new("input"));
            let locator = Locator::parse("field1").unwrap();
            let handle = resolver.resolve_one(&locator, false).unwrap();
            assert_eq!(handle.tag_name, "input");
        }

        #[test]
        fn test_resolve_one_fails_fast_without_implicit_wait() {
            let (clock, driver, resolver) = resolver();
            driver.install("late", FakeElement::new("input").appearing_at_ms(500));
            let locator = Locator::parse("late").unwrap();
            assert!(matches!(
                resolver.resolve_one(&locator, false),
                Err(NavegarError::NotFound { .. })
            ));
            assert_eq!(clock.now_ms(), 0);
        }

        #[test]
        fn test_resolve_one_blocks_with_implicit_wait() {
            let (_, driver, resolver) = resolver();
            driver.install("late", FakeElement::new("input").appearing_at_ms(500));
            let locator = Locator::parse("late").unwrap();
            assert!(resolver.resolve_one(&locator, true).is_ok());
        }

        #[test]
        fn test_resolve_one_times_out_on_stuck_overlay() {
            let (_, driver, resolver) = resolver();
            driver.install("//div[@id='loading-indicator']", FakeElement::new("div"));
            driver.install("field1", FakeElement::new("input"));
            let locator = Locator::parse("field1").unwrap();
            assert!(matches!(
                resolver.resolve_one(&locator, false),
                Err(NavegarError::Timeout { .. })
            ));
        }

        #[test]
        fn test_first_of_reports_zero_based_index() {
            // Only /input exists under //td[3]: candidates 0 and 1 miss,
            // candidate 2 matches.
            let (_, driver, resolver) = resolver();
            driver.install("//td[3]/input", FakeElement::new("input"));
            let base = Locator::parse("//td[3]").unwrap();
            let candidates =
                CandidateSet::new(["/span/span/input[2]", "/span/span/input", "/input"]).unwrap();
            let (handle, index) = resolver.resolve_first_of(&candidates, &base).unwrap();
            assert_eq!(index, 2);
            assert_eq!(handle.id, "//td[3]/input");
        }

        #[test]
        fn test_first_of_is_order_stable() {
            // Both the nested and the bare shape exist; the earlier
            // candidate wins.
            let (_, driver, resolver) = resolver();
            driver.install("//td[3]/span/span/input", FakeElement::new("input"));
            driver.install("//td[3]/input", FakeElement::new("input"));
            let base = Locator::parse("//td[3]").unwrap();
            let candidates =
                CandidateSet::new(["/span/span/input", "/input"]).unwrap();
            let (handle, index) = resolver.resolve_first_of(&candidates, &base).unwrap();
            assert_eq!(index, 0);
            assert_eq!(handle.id, "//td[3]/span/span/input");
        }

        #[test]
        fn test_first_of_exhaustion() {
            let (_, _, resolver) = resolver();
            let base = Locator::parse("//td[9]").unwrap();
            let candidates = CandidateSet::table_cell();
            match resolver.resolve_first_of(&candidates, &base) {
                Err(NavegarError::NoCandidateMatched { base, tried }) => {
                    assert_eq!(base, "//td[9]");
                    assert_eq!(tried, 4);
                }
                other => panic!("expected NoCandidateMatched, got {other:?}"),
            }
        }

        #[test]
        fn test_identity_candidate_matches_base_itself() {
            let (_, driver, resolver) = resolver();
            driver.install("//td[3]", FakeElement::new("td").with_text("read only"));
            let base = Locator::parse("//td[3]").unwrap();
            let (handle, index) = resolver
                .resolve_first_of(&CandidateSet::table_cell(), &base)
                .unwrap();
            assert_eq!(index, 3);
            assert_eq!(handle.id, "//td[3]");
        }
    }
}
