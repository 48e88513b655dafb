//! Swipe-search engine.
//!
//! A search finds one item inside a virtualized scrollable container, where
//! only the currently rendered items can be queried. Two strategies share
//! the [`SwipeSearchStrategy`] interface:
//!
//! - [`RepeatSwipe`]: swipe, settle, evaluate an arbitrary check, repeat.
//! - [`SmartSearch`]: estimate the distance to a numeric target, jump most
//!   of the way blind, then home in by comparing against the visible range.
//!
//! Both run on a [`SearchContext`], which owns the query facade, the
//! gesture executor, the timing configuration and a cancellation token.
//! Every search is a strictly sequential chain of awaits.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use swipeseek_core::agent_driver::AgentDriver;
//! use swipeseek_core::driver::AutomationDriver;
//! use swipeseek_core::locator::{ContainerLocator, ItemLocator};
//! use swipeseek_core::search::{SearchConfig, SearchContext, SmartSearch, SwipeRatio, TapItem};
//! use swipeseek_core::target::NumericTarget;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut driver = AgentDriver::new("localhost", 9800);
//! driver.connect().await?;
//! let driver: Arc<dyn AutomationDriver> = Arc::new(driver);
//!
//! let ctx = SearchContext::new(driver.clone(), SearchConfig::default());
//! let search = SmartSearch::new(
//!     ContainerLocator::id("year-wheel"),
//!     ItemLocator::of_type("StaticText"),
//!     Arc::new(NumericTarget::new(1987)),
//!     SwipeRatio::PerVisibleItem,
//!     Arc::new(TapItem::new(driver)),
//! );
//! let report = ctx.run(&search).await?;
//! assert!(report.is_found());
//! # Ok(())
//! # }
//! ```

mod hooks;
mod repeat;
mod smart;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::driver::{AutomationDriver, DriverError};
use crate::gesture::{GestureExecutor, ScrollIntent, SwipeGesture};
use crate::locator::{ContainerLocator, ItemLocator};
use crate::query::{ContainerHandle, DriverQuery, ElementQuery, ItemHandle};
use crate::target::TargetError;

pub use hooks::{FoundAction, LoopControl, NoAction, SwipeCheck, TapItem, VisibleText};
pub use repeat::RepeatSwipe;
pub use smart::{bearing, coarse_plan, fine_intent, Bearing, SmartSearch};

/// Default pause after each gesture.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Default stroke duration.
pub const DEFAULT_GESTURE_DURATION: Duration = Duration::from_millis(300);

/// Default stroke length as a fraction of the container span.
pub const DEFAULT_GESTURE_SPAN: f64 = 0.5;

/// Default cap on loop iterations.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Most blind gestures a coarse phase may issue. Mappings with large
/// value steps (timestamps, for instance) would otherwise queue a
/// practically endless jump; the fine phase corrects any shortfall.
pub const MAX_COARSE_GESTURES: u32 = 100;

/// Default retry window for the terminal match check.
pub const DEFAULT_FIND_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default pause between match-check attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Timing and bounds for a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Wait after every gesture before the UI is queried again.
    pub settle_delay: Duration,
    /// Duration of each stroke.
    pub gesture_duration: Duration,
    /// Stroke length for gestures that are not otherwise sized.
    pub gesture_span: f64,
    /// Cap on base-loop iterations and fine-phase iterations.
    ///
    /// `None` removes the cap: a target that never shows up then keeps the
    /// search running until it is cancelled.
    pub max_attempts: Option<u32>,
    /// Retry window for [`ElementQuery::find_matching`].
    pub find_timeout: Duration,
    /// Pause between [`ElementQuery::find_matching`] attempts.
    pub poll_interval: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            gesture_duration: DEFAULT_GESTURE_DURATION,
            gesture_span: DEFAULT_GESTURE_SPAN,
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            find_timeout: DEFAULT_FIND_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SearchConfig {
    /// Removes the iteration cap.
    pub fn unbounded(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Sets the iteration cap.
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = Some(max);
        self
    }

    /// Sets the settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the default stroke length.
    pub fn with_gesture_span(mut self, span: f64) -> Self {
        self.gesture_span = span;
        self
    }

    /// Sets the match-check retry window.
    pub fn with_find_timeout(mut self, timeout: Duration) -> Self {
        self.find_timeout = timeout;
        self
    }
}

/// Errors that end a search.
///
/// Transient misses and refused gestures are handled inside the loop and
/// never show up here.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The container could not be resolved.
    #[error("container {0} not found")]
    ContainerNotFound(String),

    /// The container showed no items to estimate from.
    #[error("container {0} shows no items")]
    NoVisibleItems(String),

    /// The first visible item could not be mapped to a value.
    #[error("format error: {0}")]
    Format(#[from] TargetError),

    /// The search was cancelled before its next gesture.
    #[error("search cancelled")]
    Cancelled,

    /// The action run on the found item failed.
    #[error("found action failed: {0}")]
    ActionFailed(#[source] DriverError),

    /// The automation session failed.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Where a smart search is in its algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Before any gesture.
    Estimate,
    /// Blind bulk swiping.
    Coarse,
    /// Corrective swiping with re-queries.
    Fine,
}

/// Mutable state of one running search. Never shared between searches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchState {
    /// Loop iterations run (base-loop iterations or fine-phase iterations).
    pub iterations: u32,
    /// Current phase.
    pub phase: Phase,
    /// Intent of the last gesture issued.
    pub last_intent: Option<ScrollIntent>,
    /// Gestures issued, including refused ones.
    pub gestures: u32,
    /// Gestures the session refused.
    pub rejected_gestures: u32,
    /// Gestures issued during the coarse phase.
    pub coarse_gestures: u32,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            iterations: 0,
            phase: Phase::Estimate,
            last_intent: None,
            gestures: 0,
            rejected_gestures: 0,
            coarse_gestures: 0,
        }
    }
}

impl SearchState {
    /// Gestures issued after the coarse phase.
    pub fn fine_gestures(&self) -> u32 {
        self.gestures - self.coarse_gestures
    }
}

/// How a search ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The target was found and acted upon. Strategies that match via an
    /// opaque check report no item.
    Found { item: Option<ItemHandle> },
    /// The attempt budget ran out.
    NotFound,
}

/// Summary of a finished search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    /// Unique id, also recorded on the search's tracing span.
    pub id: Uuid,
    /// Strategy name.
    pub strategy: &'static str,
    /// How it ended.
    pub outcome: SearchOutcome,
    /// Final state.
    pub state: SearchState,
    /// Wall-clock time spent.
    pub elapsed_ms: u64,
}

impl SearchReport {
    /// Returns true if the target was found.
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Found { .. })
    }
}

/// How far one gesture should travel, or how many list positions one
/// gesture is taken to advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwipeRatio {
    /// A fixed fraction.
    Fixed(f64),
    /// One over the number of currently visible items.
    PerVisibleItem,
}

impl SwipeRatio {
    /// Resolves the ratio given the number of visible items.
    ///
    /// An empty set resolves `PerVisibleItem` to `1.0`.
    pub fn resolve(self, visible: usize) -> f64 {
        match self {
            SwipeRatio::Fixed(r) => r,
            SwipeRatio::PerVisibleItem if visible == 0 => 1.0,
            SwipeRatio::PerVisibleItem => 1.0 / visible as f64,
        }
    }
}

/// A search algorithm over a [`SearchContext`].
#[async_trait]
pub trait SwipeSearchStrategy: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Runs the search, updating `state` as it goes.
    async fn search(
        &self,
        ctx: &SearchContext,
        state: &mut SearchState,
    ) -> Result<SearchOutcome, SearchError>;
}

/// Everything a running search needs from the outside world.
pub struct SearchContext {
    query: Arc<dyn ElementQuery>,
    gestures: GestureExecutor,
    config: SearchConfig,
    cancel: CancellationToken,
}

impl SearchContext {
    /// Creates a context that queries and swipes through `driver`.
    pub fn new(driver: Arc<dyn AutomationDriver>, config: SearchConfig) -> Self {
        let query = DriverQuery::new(driver.clone(), config.find_timeout, config.poll_interval);
        Self::with_query(Arc::new(query), driver, config)
    }

    /// Creates a context with a custom query facade.
    pub fn with_query(
        query: Arc<dyn ElementQuery>,
        driver: Arc<dyn AutomationDriver>,
        config: SearchConfig,
    ) -> Self {
        Self {
            query,
            gestures: GestureExecutor::new(driver),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `token` to cancel searches run on this context.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that cancels searches on this context.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The query facade.
    pub fn query(&self) -> &dyn ElementQuery {
        self.query.as_ref()
    }

    /// The driver gestures are sent through.
    pub fn driver(&self) -> &Arc<dyn AutomationDriver> {
        self.gestures.driver()
    }

    /// Timing configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs `strategy` to completion and reports how it went.
    pub async fn run(
        &self,
        strategy: &dyn SwipeSearchStrategy,
    ) -> Result<SearchReport, SearchError> {
        let id = Uuid::new_v4();
        let span = info_span!("swipe_search", %id, strategy = strategy.name());
        async {
            let start = Instant::now();
            let mut state = SearchState::default();
            let outcome = strategy.search(self, &mut state).await?;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            info!(
                found = matches!(outcome, SearchOutcome::Found { .. }),
                gestures = state.gestures,
                iterations = state.iterations,
                elapsed_ms,
                "search complete"
            );
            Ok(SearchReport {
                id,
                strategy: strategy.name(),
                outcome,
                state,
                elapsed_ms,
            })
        }
        .instrument(span)
        .await
    }

    /// Resolves a container, failing the search if it is missing.
    pub(crate) async fn resolve(
        &self,
        locator: &ContainerLocator,
    ) -> Result<ContainerHandle, SearchError> {
        self.query
            .resolve_container(locator)
            .await?
            .ok_or_else(|| SearchError::ContainerNotFound(locator.to_string()))
    }

    /// Visible items of `container`.
    pub(crate) async fn items(
        &self,
        container: &ContainerHandle,
        items: &ItemLocator,
    ) -> Result<Vec<ItemHandle>, SearchError> {
        Ok(self.query.visible_items(container, items).await?)
    }

    /// Returns true once the iteration cap is reached.
    pub(crate) fn exhausted(&self, state: &SearchState) -> bool {
        self.config
            .max_attempts
            .is_some_and(|max| state.iterations >= max)
    }

    /// Issues one gesture and waits for the UI to settle.
    ///
    /// Checks for cancellation first. A refused gesture is logged and
    /// counted as a zero-progress step; a lost session ends the search.
    /// Returns whether the gesture was accepted.
    pub(crate) async fn swipe(
        &self,
        container: &ContainerHandle,
        intent: ScrollIntent,
        ratio: f64,
        state: &mut SearchState,
    ) -> Result<bool, SearchError> {
        if self.cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let direction = container.orientation.direction(intent);
        let gesture = SwipeGesture::new(direction, ratio, self.config.gesture_duration);
        state.gestures += 1;
        state.last_intent = Some(intent);

        let accepted = match self.gestures.execute(&container.frame, &gesture).await {
            Ok(()) => true,
            Err(e) if e.is_connection_error() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, %direction, "gesture rejected");
                state.rejected_gestures += 1;
                false
            }
        };

        debug!(phase = ?state.phase, ?intent, accepted, "settling");
        tokio::time::sleep(self.config.settle_delay).await;
        Ok(accepted)
    }
}
