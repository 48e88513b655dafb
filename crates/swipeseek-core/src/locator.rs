//! Locators for scrollable containers and the items rendered inside them.
//!
//! A search is given a locator pair: a [`ContainerLocator`] naming the
//! swipeable region and an [`ItemLocator`] describing which descendants
//! count as items. Selectors accept `*` / `?` globs.

use serde::{Deserialize, Serialize};

use crate::driver::{find_in_tree, glob_match};
use crate::element::UIElement;
use crate::gesture::Orientation;

/// Identifies the scrollable container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLocator {
    /// Accessibility identifier or label to match.
    pub selector: String,
    /// Match `selector` against the label instead of the identifier.
    #[serde(default)]
    pub by_label: bool,
    /// Optional element type filter (e.g. "PickerWheel").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    /// Scroll axis; inferred from the container's shape when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
}

impl ContainerLocator {
    /// Locates the container by accessibility identifier.
    pub fn id(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            by_label: false,
            element_type: None,
            orientation: None,
        }
    }

    /// Locates the container by accessibility label.
    pub fn label(selector: impl Into<String>) -> Self {
        Self {
            by_label: true,
            ..Self::id(selector)
        }
    }

    /// Restricts matches to one element type.
    pub fn with_type(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = Some(element_type.into());
        self
    }

    /// Fixes the scroll axis instead of inferring it.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Finds the container in a tree dump.
    pub fn find<'a>(&self, tree: &'a [UIElement]) -> Option<&'a UIElement> {
        find_in_tree(tree, &self.selector, self.by_label, self.element_type.as_deref())
    }
}

impl std::fmt::Display for ContainerLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.by_label {
            write!(f, "label '{}'", self.selector)?;
        } else {
            write!(f, "'{}'", self.selector)?;
        }
        if let Some(ty) = &self.element_type {
            write!(f, " ({ty})")?;
        }
        Ok(())
    }
}

/// Describes which descendants of a container are items.
///
/// An element is an item when it shows text and, if a type filter or
/// identifier pattern is set, matches them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLocator {
    /// Optional element type filter (e.g. "Cell", "StaticText").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    /// Optional identifier glob items must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl ItemLocator {
    /// Any descendant with display text.
    pub fn any() -> Self {
        Self::default()
    }

    /// Descendants of one element type.
    pub fn of_type(element_type: impl Into<String>) -> Self {
        Self {
            element_type: Some(element_type.into()),
            identifier: None,
        }
    }

    /// Requires item identifiers to match a glob.
    pub fn with_identifier(mut self, pattern: impl Into<String>) -> Self {
        self.identifier = Some(pattern.into());
        self
    }

    /// Returns true if `element` counts as an item.
    pub fn matches(&self, element: &UIElement) -> bool {
        if element.display_text().is_none() {
            return false;
        }
        let type_ok = self
            .element_type
            .as_deref()
            .map_or(true, |t| element.element_type.as_deref() == Some(t));
        let id_ok = self.identifier.as_deref().map_or(true, |pattern| {
            element
                .identifier
                .as_deref()
                .is_some_and(|id| glob_match(pattern, id))
        });
        type_ok && id_ok
    }
}
