//! Accessibility element types reported by the on-device agent.
//!
//! These are the raw tree nodes returned by
//! [`AutomationDriver::dump_tree`](crate::driver::AutomationDriver::dump_tree).
//! Higher layers ([`query`](crate::query)) turn them into container and item
//! handles.

use serde::{Deserialize, Serialize};

/// A UI element from the accessibility hierarchy.
///
/// Elements form a tree through the `children` field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UIElement {
    /// The accessibility identifier for this element.
    #[serde(rename = "AXUniqueId", default)]
    pub identifier: Option<String>,

    /// The accessibility label, typically the user-visible text.
    #[serde(rename = "AXLabel", default)]
    pub label: Option<String>,

    /// The current value of the element (e.g. the selected wheel entry).
    #[serde(rename = "AXValue", default)]
    pub value: Option<String>,

    /// The element type (e.g. "PickerWheel", "Cell", "StaticText").
    #[serde(rename = "type", default)]
    pub element_type: Option<String>,

    /// The element's frame in screen coordinates.
    #[serde(default)]
    pub frame: Option<ElementFrame>,

    /// Child elements nested within this element.
    #[serde(default)]
    pub children: Vec<UIElement>,
}

impl UIElement {
    /// Text shown for this element: the label, falling back to the value.
    ///
    /// Empty strings count as absent.
    pub fn display_text(&self) -> Option<&str> {
        self.label
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.value.as_deref().filter(|s| !s.is_empty()))
    }
}

/// The frame (position and size) of a UI element in screen points.
///
/// The origin is the top-left corner of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementFrame {
    /// The x-coordinate of the top-left corner.
    pub x: f64,
    /// The y-coordinate of the top-left corner.
    pub y: f64,
    /// Width in points.
    pub width: f64,
    /// Height in points.
    pub height: f64,
}

impl ElementFrame {
    /// Centre point of the frame.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Returns true if the two frames overlap by a non-zero area.
    pub fn intersects(&self, other: &ElementFrame) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// The overlapping part of two frames, or `None` if they do not overlap.
    pub fn intersection(&self, other: &ElementFrame) -> Option<ElementFrame> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        Some(ElementFrame {
            x,
            y,
            width: (self.x + self.width).min(other.x + other.width) - x,
            height: (self.y + self.height).min(other.y + other.height) - y,
        })
    }
}
