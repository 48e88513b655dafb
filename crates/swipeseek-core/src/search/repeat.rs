use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{
    LoopControl, SearchContext, SearchError, SearchOutcome, SearchState, SwipeCheck, SwipeRatio,
    SwipeSearchStrategy,
};
use crate::gesture::ScrollIntent;
use crate::locator::{ContainerLocator, ItemLocator};

type IntentFn = dyn Fn(&SearchState) -> ScrollIntent + Send + Sync;

/// Swipe, settle, check, repeat.
///
/// Knows nothing about where the target is. Each iteration re-resolves the
/// container, asks for the intent of the next gesture, issues it, waits for
/// the UI to settle and asks the [`SwipeCheck`] whether to keep going.
pub struct RepeatSwipe {
    container: ContainerLocator,
    items: ItemLocator,
    intent: ScrollIntent,
    next_intent: Arc<IntentFn>,
    ratio: SwipeRatio,
    check: Arc<dyn SwipeCheck>,
}

impl RepeatSwipe {
    /// Creates a loop that always swipes towards `intent` with a fixed `ratio`.
    pub fn new(
        container: ContainerLocator,
        intent: ScrollIntent,
        ratio: f64,
        check: Arc<dyn SwipeCheck>,
    ) -> Self {
        Self {
            container,
            items: ItemLocator::any(),
            intent,
            next_intent: Arc::new(move |_: &SearchState| intent),
            ratio: SwipeRatio::Fixed(ratio),
            check,
        }
    }

    /// Picks the intent of each gesture from the running state.
    ///
    /// The state passed in already counts the iteration being run.
    pub fn with_intent_fn<F>(mut self, next: F) -> Self
    where
        F: Fn(&SearchState) -> ScrollIntent + Send + Sync + 'static,
    {
        self.next_intent = Arc::new(next);
        self
    }

    /// Sweeps back and forth: `gestures` swipes towards the initial intent,
    /// then as many the other way, and so on. Useful when the start
    /// position within the list is unknown.
    pub fn bounce_every(self, gestures: u32) -> Self {
        let forth = self.intent;
        let gestures = gestures.max(1);
        self.with_intent_fn(move |state| {
            if (state.iterations.saturating_sub(1) / gestures) % 2 == 0 {
                forth
            } else {
                forth.reversed()
            }
        })
    }

    /// Sizes every gesture from the current number of visible `items`.
    pub fn per_visible_item(mut self, items: ItemLocator) -> Self {
        self.items = items;
        self.ratio = SwipeRatio::PerVisibleItem;
        self
    }
}

#[async_trait]
impl SwipeSearchStrategy for RepeatSwipe {
    fn name(&self) -> &'static str {
        "repeat"
    }

    async fn search(
        &self,
        ctx: &SearchContext,
        state: &mut SearchState,
    ) -> Result<SearchOutcome, SearchError> {
        loop {
            if ctx.exhausted(state) {
                debug!(iterations = state.iterations, "attempts exhausted");
                return Ok(SearchOutcome::NotFound);
            }
            state.iterations += 1;

            let container = ctx.resolve(&self.container).await?;
            let ratio = match self.ratio {
                SwipeRatio::Fixed(r) => r,
                per_item => per_item.resolve(ctx.items(&container, &self.items).await?.len()),
            };

            let intent = (self.next_intent)(state);
            ctx.swipe(&container, intent, ratio, state).await?;

            if self.check.check(ctx, &container).await? == LoopControl::Stop {
                return Ok(SearchOutcome::Found { item: None });
            }
        }
    }
}
