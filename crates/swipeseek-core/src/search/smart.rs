use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{
    FoundAction, Phase, SearchContext, SearchError, SearchOutcome, SearchState, SwipeRatio,
    SwipeSearchStrategy, MAX_COARSE_GESTURES,
};
use crate::gesture::ScrollIntent;
use crate::locator::{ContainerLocator, ItemLocator};
use crate::query::ItemHandle;
use crate::target::TargetSpec;

/// Where the target lies relative to the visible range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bearing {
    /// Below the first visible value.
    Before,
    /// Above the last visible value.
    After,
    /// Between them, inclusive.
    Within,
}

/// Number of blind gestures for the coarse phase, and their intent.
///
/// `difference` is `target - first visible`; the count is
/// `round(|difference| * ratio)`, rounding halves away from zero, capped at
/// [`MAX_COARSE_GESTURES`].
pub fn coarse_plan(difference: f64, ratio: f64) -> (u32, ScrollIntent) {
    let count = (difference.abs() * ratio).round();
    let count = if count.is_finite() && count > 0.0 {
        count.min(f64::from(MAX_COARSE_GESTURES)) as u32
    } else {
        0
    };
    let intent = if difference > 0.0 {
        ScrollIntent::Forward
    } else {
        ScrollIntent::Backward
    };
    (count, intent)
}

/// Compares `target` against the first and last visible values.
pub fn bearing(target: f64, first: f64, last: f64) -> Bearing {
    if target < first {
        Bearing::Before
    } else if target > last {
        Bearing::After
    } else {
        Bearing::Within
    }
}

/// Intent of the next corrective gesture.
///
/// A target inside the visible range that was not matched is a
/// misdetection; the previous intent is repeated to make the UI refresh.
pub fn fine_intent(bearing: Bearing, last: Option<ScrollIntent>) -> ScrollIntent {
    match bearing {
        Bearing::Before => ScrollIntent::Backward,
        Bearing::After => ScrollIntent::Forward,
        Bearing::Within => last.unwrap_or(ScrollIntent::Forward),
    }
}

/// Estimate, jump, home in.
///
/// Reads the first visible item once to estimate the distance to the
/// target, issues `round(|distance| * ratio)` gestures without looking,
/// then corrects one gesture at a time by comparing the target against the
/// visible range until the exact match text shows up.
///
/// The target's numeric mapping must increase along the container's
/// on-screen order.
pub struct SmartSearch {
    container: ContainerLocator,
    items: ItemLocator,
    target: Arc<dyn TargetSpec>,
    ratio: SwipeRatio,
    on_found: Arc<dyn FoundAction>,
}

impl SmartSearch {
    pub fn new(
        container: ContainerLocator,
        items: ItemLocator,
        target: Arc<dyn TargetSpec>,
        ratio: SwipeRatio,
        on_found: Arc<dyn FoundAction>,
    ) -> Self {
        Self {
            container,
            items,
            target,
            ratio,
            on_found,
        }
    }

    /// First and last visible values that parse.
    fn visible_range(&self, visible: &[ItemHandle]) -> Option<(f64, f64)> {
        let mut values = visible
            .iter()
            .filter_map(|item| self.target.item_value(&item.text).ok());
        let first = values.next()?;
        Some((first, values.last().unwrap_or(first)))
    }

    fn exact_match<'a>(&self, visible: &'a [ItemHandle]) -> Option<&'a ItemHandle> {
        let text = self.target.match_text();
        visible.iter().find(|item| item.text == text)
    }

    async fn select(&self, item: ItemHandle) -> Result<SearchOutcome, SearchError> {
        debug!(text = %item.text, "target visible");
        self.on_found
            .on_found(item.clone())
            .await
            .map_err(SearchError::ActionFailed)?;
        Ok(SearchOutcome::Found { item: Some(item) })
    }
}

#[async_trait]
impl SwipeSearchStrategy for SmartSearch {
    fn name(&self) -> &'static str {
        "smart"
    }

    async fn search(
        &self,
        ctx: &SearchContext,
        state: &mut SearchState,
    ) -> Result<SearchOutcome, SearchError> {
        let container = ctx.resolve(&self.container).await?;
        let span = ctx.config().gesture_span;
        let target = self.target.target_value();

        // Estimate
        let visible = ctx.items(&container, &self.items).await?;
        let first = visible
            .first()
            .ok_or_else(|| SearchError::NoVisibleItems(self.container.to_string()))?;
        let difference = target - self.target.item_value(&first.text)?;
        if let Some(item) = self.exact_match(&visible) {
            return self.select(item.clone()).await;
        }

        // Coarse
        let (count, intent) = coarse_plan(difference, self.ratio.resolve(visible.len()));
        debug!(difference, count, ?intent, "coarse phase");
        state.phase = Phase::Coarse;
        for _ in 0..count {
            ctx.swipe(&container, intent, span, state).await?;
            state.coarse_gestures += 1;
        }

        // Fine
        debug!("fine phase");
        state.phase = Phase::Fine;
        loop {
            if ctx.exhausted(state) {
                debug!(iterations = state.iterations, "attempts exhausted");
                return Ok(SearchOutcome::NotFound);
            }
            state.iterations += 1;

            let visible = ctx.items(&container, &self.items).await?;
            if let Some(item) = self.exact_match(&visible) {
                return self.select(item.clone()).await;
            }

            let bearing = self
                .visible_range(&visible)
                .map_or(Bearing::Within, |(first, last)| bearing(target, first, last));
            if bearing == Bearing::Within {
                let rechecked = ctx
                    .query()
                    .find_matching(&container, &self.items, self.target.match_text())
                    .await?;
                if let Some(item) = rechecked {
                    return self.select(item).await;
                }
            }

            let intent = fine_intent(bearing, state.last_intent);
            debug!(?bearing, ?intent, "corrective gesture");
            ctx.swipe(&container, intent, span, state).await?;
        }
    }
}
