//! Actions a caller can ask the [`ActionExecutor`](crate::executor::ActionExecutor) to run.
//!
//! Actions are plain data and serialize as JSON with a `type` tag, so they
//! can be scripted or sent over the wire.
//!
//! ```
//! use swipeseek_core::action::ActionType;
//! use swipeseek_core::locator::{ContainerLocator, ItemLocator};
//!
//! let action = ActionType::SelectValue {
//!     container: ContainerLocator::id("year-wheel"),
//!     items: ItemLocator::any(),
//!     value: "1987".to_string(),
//!     choices: None,
//! };
//! assert_eq!(action.name(), "select_value");
//! ```

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::gesture::ScrollIntent;
use crate::locator::{ContainerLocator, ItemLocator};

/// Types of actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionType {
    /// Tap an element by ID or label.
    Tap {
        /// Accessibility ID or label.
        selector: String,
        /// If true, selector is a label.
        #[serde(default)]
        by_label: bool,
        /// Optional element type filter.
        #[serde(default)]
        element_type: Option<String>,
    },

    /// Tap at screen coordinates.
    TapLocation { x: i32, y: i32 },

    /// One swipe inside a container, or across the whole screen when no
    /// container is given.
    Swipe {
        /// "up", "down", "left" or "right".
        direction: String,
        #[serde(default)]
        container: Option<ContainerLocator>,
    },

    /// Swipe a container until an item with `text` is visible.
    ScrollTo {
        container: ContainerLocator,
        #[serde(default)]
        items: ItemLocator,
        /// Exact display text to look for.
        text: String,
        /// Which way to scroll.
        direction: ScrollIntent,
        /// Tap the item once visible.
        #[serde(default)]
        tap: bool,
    },

    /// Select a value on one wheel or list.
    ///
    /// With `choices`, `value` is looked up among them; without, it must be
    /// an integer.
    SelectValue {
        container: ContainerLocator,
        #[serde(default)]
        items: ItemLocator,
        value: String,
        #[serde(default)]
        choices: Option<Vec<String>>,
    },

    /// Set a date on day / month / year wheels.
    SelectDate {
        day: ContainerLocator,
        month: ContainerLocator,
        year: ContainerLocator,
        date: NaiveDate,
    },

    /// Set a time on hour / minute wheels.
    SelectTime {
        hour: ContainerLocator,
        minute: ContainerLocator,
        time: NaiveTime,
    },
}

impl ActionType {
    /// Short, static name for tracing span metadata.
    pub fn name(&self) -> &'static str {
        match self {
            ActionType::Tap { .. } => "tap",
            ActionType::TapLocation { .. } => "tap_location",
            ActionType::Swipe { .. } => "swipe",
            ActionType::ScrollTo { .. } => "scroll_to",
            ActionType::SelectValue { .. } => "select_value",
            ActionType::SelectDate { .. } => "select_date",
            ActionType::SelectTime { .. } => "select_time",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let action = ActionType::TapLocation { x: 10, y: 20 };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "TapLocation");
        assert_eq!(json["x"], 10);
    }

    #[test]
    fn optional_fields_default() {
        let action: ActionType = serde_json::from_str(
            r#"{"type":"ScrollTo","container":{"selector":"list"},"text":"Row 40","direction":"forward"}"#,
        )
        .unwrap();
        match action {
            ActionType::ScrollTo {
                container,
                items,
                direction,
                tap,
                ..
            } => {
                assert_eq!(container, ContainerLocator::id("list"));
                assert_eq!(items, ItemLocator::any());
                assert_eq!(direction, ScrollIntent::Forward);
                assert!(!tap);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dates_use_iso_format() {
        let action = ActionType::SelectDate {
            day: ContainerLocator::id("d"),
            month: ContainerLocator::id("m"),
            year: ContainerLocator::id("y"),
            date: NaiveDate::from_ymd_opt(1987, 3, 14).unwrap(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["date"], "1987-03-14");
        assert_eq!(action.name(), "select_date");
    }
}
