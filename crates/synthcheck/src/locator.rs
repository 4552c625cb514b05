//! Declarative element locators.
//!
//! A [`Locator`] describes *which* elements to find; it is never a handle to
//! a live node. Every use re-resolves it against the current DOM, because the
//! application mutates the page between stages.
//!
//! Resolution happens in two halves:
//!
//! - the structural part (tag, role, attributes) is rendered to CSS and
//!   evaluated by the capability provider, which returns one
//!   [`ElementSnapshot`] per CSS match
//! - the text filter is evaluated here, in [`Locator::matches`], so every
//!   provider shares the same text semantics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A point in 2D space (viewport coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box for an element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the center point
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if a point is inside this bounding box
    #[must_use]
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Whether the box has a non-zero area
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Text filter applied to an element's rendered text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// Case-insensitive substring after whitespace normalization
    Contains(String),
    /// Whitespace-normalized equality (case-sensitive)
    Exact(String),
}

impl TextMatch {
    /// Check whether `text` satisfies this filter
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        let actual = normalize_whitespace(text);
        match self {
            Self::Contains(needle) => actual
                .to_lowercase()
                .contains(&normalize_whitespace(needle).to_lowercase()),
            Self::Exact(expected) => actual == normalize_whitespace(expected),
        }
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A point-in-time read of one DOM element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
    /// Position of the element in the structural (CSS) match list
    #[serde(default)]
    pub index: usize,
    /// Lowercase tag name
    pub tag: String,
    /// Rendered text content
    #[serde(default)]
    pub text: String,
    /// Element attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Whether the element is rendered and not hidden
    pub visible: bool,
    /// Viewport bounding box when visible
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
}

impl ElementSnapshot {
    /// Create a visible element with a default 100x40 box at the origin
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            index: 0,
            tag: tag.into().to_lowercase(),
            text: String::new(),
            attributes: BTreeMap::new(),
            visible: true,
            bounding_box: Some(BoundingBox::new(0.0, 0.0, 100.0, 40.0)),
        }
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the bounding box
    #[must_use]
    pub const fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    /// Mark the element hidden (no box, not visible)
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self.bounding_box = None;
        self
    }

    /// Get an attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Point to aim input at, if the element can receive it
    #[must_use]
    pub fn click_point(&self) -> Option<Point> {
        if !self.visible {
            return None;
        }
        self.bounding_box
            .filter(BoundingBox::has_area)
            .map(|b| b.center())
    }
}

/// A declarative description of which DOM element(s) to find.
///
/// ```
/// use synthcheck::Locator;
///
/// let square = Locator::tag("button").with_text("Square");
/// assert_eq!(square.to_css(), "button");
///
/// let slider = Locator::tag("input").with_attribute("type", "range");
/// assert_eq!(slider.to_css(), r#"input[type="range"]"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<TextMatch>,
}

impl Locator {
    /// Match any element
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Match elements by tag name
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into().to_lowercase()),
            ..Self::default()
        }
    }

    /// Match elements by explicit ARIA role attribute
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            ..Self::default()
        }
    }

    /// Require an attribute with an exact value
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Filter by text content (case-insensitive substring, like `:has-text`)
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(TextMatch::Contains(text.into()));
        self
    }

    /// Filter by exact text content
    #[must_use]
    pub fn with_exact_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(TextMatch::Exact(text.into()));
        self
    }

    /// Get the text filter
    #[must_use]
    pub const fn text_filter(&self) -> Option<&TextMatch> {
        self.text.as_ref()
    }

    /// Render the structural part of the locator as a CSS selector
    #[must_use]
    pub fn to_css(&self) -> String {
        let mut css = self.tag.clone().unwrap_or_default();
        if let Some(role) = &self.role {
            css.push_str(&format!("[role=\"{}\"]", escape_css_string(role)));
        }
        for (name, value) in &self.attributes {
            css.push_str(&format!("[{name}=\"{}\"]", escape_css_string(value)));
        }
        if css.is_empty() {
            css.push('*');
        }
        css
    }

    /// Check tag, role and attributes
    #[must_use]
    pub fn matches_structure(&self, element: &ElementSnapshot) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(role) = &self.role {
            if element.attribute("role") != Some(role.as_str()) {
                return false;
            }
        }
        self.attributes
            .iter()
            .all(|(name, value)| element.attribute(name) == Some(value.as_str()))
    }

    /// Full predicate: structure plus text filter
    #[must_use]
    pub fn matches(&self, element: &ElementSnapshot) -> bool {
        self.matches_structure(element)
            && self
                .text
                .as_ref()
                .map_or(true, |filter| filter.is_match(&element.text))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_css())?;
        match &self.text {
            Some(TextMatch::Contains(t)) => write!(f, ":has-text({t:?})"),
            Some(TextMatch::Exact(t)) => write!(f, ":text-is({t:?})"),
            None => Ok(()),
        }
    }
}

fn escape_css_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod text_match_tests {
        use super::*;

        #[test]
        fn test_contains_is_case_insensitive() {
            let filter = TextMatch::Contains("square".to_string());
            assert!(filter.is_match("Square"));
            assert!(filter.is_match("  Square  wave "));
            assert!(!filter.is_match("Sine"));
        }

        #[test]
        fn test_contains_normalizes_whitespace() {
            let filter = TextMatch::Contains("Cutoff  Frequency".to_string());
            assert!(filter.is_match("Cutoff\n   frequency (Hz)"));
        }

        #[test]
        fn test_exact_requires_equality() {
            let filter = TextMatch::Exact("A".to_string());
            assert!(filter.is_match(" A "));
            assert!(!filter.is_match("Saw"));
            assert!(!filter.is_match("a"));
        }
    }

    mod css_tests {
        use super::*;

        #[test]
        fn test_tag_only() {
            assert_eq!(Locator::tag("H1").to_css(), "h1");
        }

        #[test]
        fn test_any_renders_universal() {
            assert_eq!(Locator::any().to_css(), "*");
        }

        #[test]
        fn test_role_and_attributes() {
            let locator = Locator::role("slider").with_attribute("aria-label", "Cutoff");
            assert_eq!(
                locator.to_css(),
                r#"[role="slider"][aria-label="Cutoff"]"#
            );
        }

        #[test]
        fn test_attribute_value_escaped() {
            let locator = Locator::tag("div").with_attribute("data-name", r#"say "hi""#);
            assert_eq!(locator.to_css(), r#"div[data-name="say \"hi\""]"#);
        }

        #[test]
        fn test_display_includes_text_filter() {
            let locator = Locator::tag("button").with_text("Square");
            assert_eq!(locator.to_string(), r#"button:has-text("Square")"#);
            let exact = Locator::tag("button").with_exact_text("A");
            assert_eq!(exact.to_string(), r#"button:text-is("A")"#);
        }
    }

    mod matching_tests {
        use super::*;

        #[test]
        fn test_matches_tag_and_text() {
            let el = ElementSnapshot::new("button").with_text("Square");
            assert!(Locator::tag("button").with_text("squ").matches(&el));
            assert!(!Locator::tag("label").with_text("Square").matches(&el));
            assert!(!Locator::tag("button").with_text("Saw").matches(&el));
        }

        #[test]
        fn test_matches_attributes() {
            let el = ElementSnapshot::new("input").with_attribute("type", "range");
            assert!(Locator::tag("input")
                .with_attribute("type", "range")
                .matches(&el));
            assert!(!Locator::tag("input")
                .with_attribute("type", "text")
                .matches(&el));
        }

        #[test]
        fn test_matches_role() {
            let el = ElementSnapshot::new("div").with_attribute("role", "slider");
            assert!(Locator::role("slider").matches(&el));
            assert!(!Locator::role("button").matches(&el));
        }

        #[test]
        fn test_text_ignored_by_structure_check() {
            let el = ElementSnapshot::new("button").with_text("Sine");
            let locator = Locator::tag("button").with_text("Square");
            assert!(locator.matches_structure(&el));
            assert!(!locator.matches(&el));
        }
    }

    mod snapshot_tests {
        use super::*;

        #[test]
        fn test_click_point_is_center() {
            let el = ElementSnapshot::new("button")
                .with_bounding_box(BoundingBox::new(10.0, 20.0, 100.0, 40.0));
            assert_eq!(el.click_point(), Some(Point::new(60.0, 40.0)));
        }

        #[test]
        fn test_hidden_has_no_click_point() {
            let el = ElementSnapshot::new("button").hidden();
            assert!(el.click_point().is_none());
        }

        #[test]
        fn test_zero_area_has_no_click_point() {
            let el = ElementSnapshot::new("button")
                .with_bounding_box(BoundingBox::new(0.0, 0.0, 0.0, 10.0));
            assert!(el.click_point().is_none());
        }

        #[test]
        fn test_deserializes_provider_json() {
            let json = r#"{
                "index": 2,
                "tag": "label",
                "text": "Cutoff",
                "attributes": {"for": "cutoff"},
                "visible": true,
                "boundingBox": {"x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0}
            }"#;
            let el: ElementSnapshot = serde_json::from_str(json).unwrap();
            assert_eq!(el.index, 2);
            assert_eq!(el.attribute("for"), Some("cutoff"));
            assert!(el.bounding_box.is_some());
        }

        #[test]
        fn test_bounding_box_contains_edges() {
            let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
            assert!(bbox.contains(&Point::new(0.0, 0.0)));
            assert!(bbox.contains(&Point::new(100.0, 100.0)));
            assert!(!bbox.contains(&Point::new(-1.0, 50.0)));
        }
    }

    proptest! {
        #[test]
        fn prop_contains_matches_own_text(text in "[A-Za-z][A-Za-z ]{0,20}") {
            let el = ElementSnapshot::new("button").with_text(text.clone());
            prop_assert!(Locator::tag("button").with_text(text).matches(&el));
        }

        #[test]
        fn prop_full_match_implies_structural_match(
            tag in "[a-z]{1,8}",
            el_tag in "[a-z]{1,8}",
            text in "[A-Za-z]{1,10}",
        ) {
            let locator = Locator::tag(tag).with_text(text.clone());
            let el = ElementSnapshot::new(el_tag).with_text(text);
            if locator.matches(&el) {
                prop_assert!(locator.matches_structure(&el));
            }
        }
    }
}
