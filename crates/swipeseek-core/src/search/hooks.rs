//! Caller-supplied behaviour plugged into a search: what to do once the
//! target is found, and when the repeat loop should stop.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{SearchContext, SearchError};
use crate::driver::{AutomationDriver, DriverError};
use crate::locator::ItemLocator;
use crate::query::{ContainerHandle, ItemHandle};

/// Action run once on the matched item.
///
/// Any `Fn(ItemHandle) -> impl Future<Output = Result<(), DriverError>>`
/// closure implements it.
#[async_trait]
pub trait FoundAction: Send + Sync {
    async fn on_found(&self, item: ItemHandle) -> Result<(), DriverError>;
}

#[async_trait]
impl<F, Fut> FoundAction for F
where
    F: Fn(ItemHandle) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), DriverError>> + Send + 'static,
{
    async fn on_found(&self, item: ItemHandle) -> Result<(), DriverError> {
        (self)(item).await
    }
}

/// Does nothing with the found item. Useful when only visibility matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAction;

#[async_trait]
impl FoundAction for NoAction {
    async fn on_found(&self, _item: ItemHandle) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Taps the found item: at its frame centre when known, otherwise by
/// identifier, otherwise by label.
#[derive(Clone)]
pub struct TapItem {
    driver: Arc<dyn AutomationDriver>,
}

impl TapItem {
    pub fn new(driver: Arc<dyn AutomationDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl FoundAction for TapItem {
    async fn on_found(&self, item: ItemHandle) -> Result<(), DriverError> {
        if let Some(frame) = item.frame {
            let (x, y) = frame.center();
            debug!(text = %item.text, x, y, "tapping found item");
            return self
                .driver
                .tap_location(x.round() as i32, y.round() as i32)
                .await;
        }
        match &item.identifier {
            Some(id) => self.driver.tap_element(id).await,
            None => self.driver.tap_by_label(&item.text).await,
        }
    }
}

/// Whether the repeat loop should issue another gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    KeepSwiping,
    Stop,
}

/// Predicate evaluated after each gesture of a [`RepeatSwipe`](super::RepeatSwipe).
///
/// The check owns any terminal action: when it returns
/// [`LoopControl::Stop`] the loop simply ends. Closures of the form
/// `Fn(ContainerHandle) -> impl Future<Output = Result<LoopControl, DriverError>>`
/// implement it.
#[async_trait]
pub trait SwipeCheck: Send + Sync {
    async fn check(
        &self,
        ctx: &SearchContext,
        container: &ContainerHandle,
    ) -> Result<LoopControl, SearchError>;
}

#[async_trait]
impl<F, Fut> SwipeCheck for F
where
    F: Fn(ContainerHandle) -> Fut + Send + Sync,
    Fut: Future<Output = Result<LoopControl, DriverError>> + Send + 'static,
{
    async fn check(
        &self,
        _ctx: &SearchContext,
        container: &ContainerHandle,
    ) -> Result<LoopControl, SearchError> {
        Ok((self)(container.clone()).await?)
    }
}

/// Stops once an item with the given text is visible, running `on_found` on it.
pub struct VisibleText {
    items: ItemLocator,
    text: String,
    on_found: Arc<dyn FoundAction>,
}

impl VisibleText {
    pub fn new(items: ItemLocator, text: impl Into<String>, on_found: Arc<dyn FoundAction>) -> Self {
        Self {
            items,
            text: text.into(),
            on_found,
        }
    }
}

#[async_trait]
impl SwipeCheck for VisibleText {
    async fn check(
        &self,
        ctx: &SearchContext,
        container: &ContainerHandle,
    ) -> Result<LoopControl, SearchError> {
        let visible = ctx.items(container, &self.items).await?;
        let Some(item) = visible.into_iter().find(|i| i.text == self.text) else {
            return Ok(LoopControl::KeepSwiping);
        };
        self.on_found
            .on_found(item)
            .await
            .map_err(SearchError::ActionFailed)?;
        Ok(LoopControl::Stop)
    }
}
