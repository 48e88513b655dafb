//! Element query facade used by the search loop.
//!
//! Every call works from a fresh tree dump: item sets are never cached,
//! because a virtualized container only renders what is on screen and the
//! set changes after each gesture. Queries are fail-soft. A refused command
//! yields an empty item set rather than an error, so the loop can keep
//! going; only a lost session is reported.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::driver::{AutomationDriver, DriverError};
use crate::element::{ElementFrame, UIElement};
use crate::gesture::Orientation;
use crate::locator::{ContainerLocator, ItemLocator};

/// A resolved scrollable container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerHandle {
    /// The locator this handle was resolved from.
    pub locator: ContainerLocator,
    /// Bounds used to place gestures.
    pub frame: ElementFrame,
    /// Scroll axis.
    pub orientation: Orientation,
}

/// One item currently rendered inside a container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemHandle {
    /// Display text (label, falling back to value).
    pub text: String,
    /// Accessibility identifier, if any.
    pub identifier: Option<String>,
    /// Part of the item's frame inside the container, if reported. Items
    /// cut off at the container edge are clipped, so the centre is always
    /// a point on the container.
    pub frame: Option<ElementFrame>,
}

/// Queries the engine needs from the device.
#[async_trait]
pub trait ElementQuery: Send + Sync {
    /// Resolves the container, or `None` if it is not on screen.
    async fn resolve_container(
        &self,
        locator: &ContainerLocator,
    ) -> Result<Option<ContainerHandle>, DriverError>;

    /// Items currently visible in the container, in on-screen order.
    ///
    /// May be empty; never fails because something is not rendered yet.
    async fn visible_items(
        &self,
        container: &ContainerHandle,
        items: &ItemLocator,
    ) -> Result<Vec<ItemHandle>, DriverError>;

    /// Looks for a visible item whose text equals `text`, retrying for a
    /// bounded time before giving up with `None`.
    async fn find_matching(
        &self,
        container: &ContainerHandle,
        items: &ItemLocator,
        text: &str,
    ) -> Result<Option<ItemHandle>, DriverError>;
}

/// Builds a container handle from a located element.
///
/// Returns `None` when the element reports no frame, since gestures cannot be
/// placed without bounds.
pub fn container_handle(locator: &ContainerLocator, element: &UIElement) -> Option<ContainerHandle> {
    let frame = element.frame?;
    Some(ContainerHandle {
        locator: locator.clone(),
        frame,
        orientation: locator
            .orientation
            .unwrap_or_else(|| Orientation::infer(&frame)),
    })
}

/// Collects the items of `container` that intersect `bounds`, ordered along
/// `orientation`.
///
/// A matching element is not searched further, so a cell and the text
/// inside it are not both reported. Elements without a frame are kept and
/// sorted after positioned ones.
pub fn collect_visible(
    container: &UIElement,
    bounds: &ElementFrame,
    orientation: Orientation,
    items: &ItemLocator,
) -> Vec<ItemHandle> {
    fn walk(
        elements: &[UIElement],
        bounds: &ElementFrame,
        items: &ItemLocator,
        out: &mut Vec<ItemHandle>,
    ) {
        for element in elements {
            if items.matches(element) {
                let frame = match element.frame {
                    Some(f) => match f.intersection(bounds) {
                        Some(visible) => Some(visible),
                        None => continue,
                    },
                    None => None,
                };
                if let Some(text) = element.display_text() {
                    out.push(ItemHandle {
                        text: text.to_string(),
                        identifier: element.identifier.clone(),
                        frame,
                    });
                }
            } else {
                walk(&element.children, bounds, items, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(&container.children, bounds, items, &mut out);

    let position = |item: &ItemHandle| {
        item.frame.map_or(f64::MAX, |f| match orientation {
            Orientation::Vertical => f.y,
            Orientation::Horizontal => f.x,
        })
    };
    out.sort_by(|a, b| position(a).partial_cmp(&position(b)).unwrap_or(Ordering::Equal));
    out
}

/// [`ElementQuery`] over an [`AutomationDriver`]'s tree dumps.
#[derive(Clone)]
pub struct DriverQuery {
    driver: Arc<dyn AutomationDriver>,
    find_timeout: Duration,
    poll_interval: Duration,
}

impl DriverQuery {
    /// Creates a query facade.
    ///
    /// `find_timeout` bounds [`find_matching`](ElementQuery::find_matching);
    /// `poll_interval` is the pause between its attempts.
    pub fn new(driver: Arc<dyn AutomationDriver>, find_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            driver,
            find_timeout,
            poll_interval,
        }
    }

    async fn dump_soft(&self) -> Result<Option<Vec<UIElement>>, DriverError> {
        match self.driver.dump_tree().await {
            Ok(tree) => Ok(Some(tree)),
            Err(e) if e.is_connection_error() => Err(e),
            Err(e) => {
                debug!(error = %e, "tree dump failed, treating as empty");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ElementQuery for DriverQuery {
    async fn resolve_container(
        &self,
        locator: &ContainerLocator,
    ) -> Result<Option<ContainerHandle>, DriverError> {
        let Some(tree) = self.dump_soft().await? else {
            return Ok(None);
        };
        Ok(locator
            .find(&tree)
            .and_then(|element| container_handle(locator, element)))
    }

    async fn visible_items(
        &self,
        container: &ContainerHandle,
        items: &ItemLocator,
    ) -> Result<Vec<ItemHandle>, DriverError> {
        let Some(tree) = self.dump_soft().await? else {
            return Ok(Vec::new());
        };
        let Some(element) = container.locator.find(&tree) else {
            debug!(container = %container.locator, "container missing from dump");
            return Ok(Vec::new());
        };
        let bounds = element.frame.unwrap_or(container.frame);
        Ok(collect_visible(element, &bounds, container.orientation, items))
    }

    async fn find_matching(
        &self,
        container: &ContainerHandle,
        items: &ItemLocator,
        text: &str,
    ) -> Result<Option<ItemHandle>, DriverError> {
        let deadline = Instant::now() + self.find_timeout;
        loop {
            let visible = self.visible_items(container, items).await?;
            if let Some(found) = visible.into_iter().find(|item| item.text == text) {
                return Ok(Some(found));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
