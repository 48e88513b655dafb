//! Action execution.
//!
//! [`ActionExecutor`] turns an [`ActionType`] into driver calls and swipe
//! searches, and folds every outcome into an [`ExecutionResult`]. Errors
//! never escape: a failed action is a result with `success == false`.
//!
//! # Example
//!
//! ```no_run
//! use swipeseek_core::action::ActionType;
//! use swipeseek_core::executor::ActionExecutor;
//!
//! #[tokio::main]
//! async fn main() {
//!     let executor = ActionExecutor::with_agent_connected("localhost", 9800)
//!         .await
//!         .expect("agent reachable");
//!
//!     let result = executor
//!         .execute(ActionType::Swipe {
//!             direction: "up".to_string(),
//!             container: None,
//!         })
//!         .await;
//!     println!("{}", result.message);
//! }
//! ```

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use crate::action::ActionType;
use crate::agent_driver::AgentDriver;
use crate::driver::{AutomationDriver, DriverConfig, DriverError};
use crate::gesture::{Direction, GestureExecutor, SwipeGesture};
use crate::locator::ContainerLocator;
use crate::picker::{DatePicker, TimePicker, WheelPicker};
use crate::search::{
    FoundAction, NoAction, RepeatSwipe, SearchConfig, SearchContext, TapItem, VisibleText,
};

/// Result of executing an action.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Whether the action completed successfully.
    pub success: bool,
    /// Human-readable description of the result.
    pub message: String,
    /// Additional JSON data (search reports, found item).
    pub data: Option<String>,
}

impl ExecutionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: String) -> Self {
        self.data = Some(data);
        self
    }

    /// Attaches `value` as JSON; serialization failures are dropped.
    fn with_json(self, value: &impl Serialize) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => self.with_data(json),
            Err(_) => self,
        }
    }
}

/// Executes actions against one automation driver.
pub struct ActionExecutor {
    driver: Arc<dyn AutomationDriver>,
    config: SearchConfig,
    cancel: CancellationToken,
}

impl ActionExecutor {
    /// Creates an executor with default search timing.
    pub fn new(driver: Arc<dyn AutomationDriver>) -> Self {
        Self {
            driver,
            config: SearchConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Connects an [`AgentDriver`] and wraps it.
    pub async fn with_agent_connected(
        host: impl Into<String>,
        port: u16,
    ) -> Result<Self, DriverError> {
        let mut driver = AgentDriver::new(host, port);
        driver.connect().await?;
        Ok(Self::new(Arc::new(driver)))
    }

    /// Like [`with_agent_connected`](Self::with_agent_connected), from a [`DriverConfig`].
    pub async fn from_config_connected(config: &DriverConfig) -> Result<Self, DriverError> {
        Self::with_agent_connected(config.host.clone(), config.port).await
    }

    /// Replaces the search timing.
    pub fn with_search_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Cancels running searches when `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn driver(&self) -> &Arc<dyn AutomationDriver> {
        &self.driver
    }

    fn context(&self) -> SearchContext {
        SearchContext::new(self.driver.clone(), self.config.clone())
            .with_cancellation(self.cancel.clone())
    }

    /// Executes an action and returns the result.
    pub async fn execute(&self, action: ActionType) -> ExecutionResult {
        let span = info_span!("execute_action", action = action.name());
        async {
            let start = Instant::now();
            let result = self.execute_inner(action).await;
            debug!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                success = result.success,
                "action complete"
            );
            result
        }
        .instrument(span)
        .await
    }

    async fn execute_inner(&self, action: ActionType) -> ExecutionResult {
        match action {
            ActionType::Tap {
                ref selector,
                by_label,
                ref element_type,
            } => {
                let result = match element_type {
                    Some(ty) => self.tap_typed(selector, by_label, ty).await,
                    None if by_label => self.driver.tap_by_label(selector).await,
                    None => self.driver.tap_element(selector).await,
                };
                match result {
                    Ok(()) if by_label => {
                        ExecutionResult::success(format!("Tapped element with label '{selector}'"))
                    }
                    Ok(()) => ExecutionResult::success(format!("Tapped element '{selector}'")),
                    Err(e) => ExecutionResult::failure(e.to_string()),
                }
            }

            ActionType::TapLocation { x, y } => {
                if x < 0 || y < 0 {
                    return ExecutionResult::failure(format!(
                        "Coordinates must be non-negative (got x={x}, y={y})"
                    ));
                }
                match self.driver.tap_location(x, y).await {
                    Ok(()) => ExecutionResult::success(format!("Tapped at ({x}, {y})")),
                    Err(e) => ExecutionResult::failure(e.to_string()),
                }
            }

            ActionType::Swipe {
                ref direction,
                ref container,
            } => {
                let direction: Direction = match direction.parse() {
                    Ok(d) => d,
                    Err(msg) => return ExecutionResult::failure(msg),
                };
                match self.swipe(direction, container.as_ref()).await {
                    Ok(()) => ExecutionResult::success(format!("Swiped {direction}")),
                    Err(msg) => ExecutionResult::failure(msg),
                }
            }

            ActionType::ScrollTo {
                container,
                items,
                text,
                direction,
                tap,
            } => {
                let ctx = self.context();
                let on_found: Arc<dyn FoundAction> = if tap {
                    Arc::new(TapItem::new(self.driver.clone()))
                } else {
                    Arc::new(NoAction)
                };

                // Already on screen: no gesture needed.
                let visible = match ctx.query().resolve_container(&container).await {
                    Ok(Some(handle)) => ctx.query().visible_items(&handle, &items).await,
                    Ok(None) => {
                        return ExecutionResult::failure(format!(
                            "container {container} not found"
                        ))
                    }
                    Err(e) => return ExecutionResult::failure(e.to_string()),
                };
                match visible.map(|v| v.into_iter().find(|i| i.text == text)) {
                    Ok(Some(item)) => {
                        return match on_found.on_found(item.clone()).await {
                            Ok(()) => ExecutionResult::success(format!("'{text}' already visible"))
                                .with_json(&item),
                            Err(e) => ExecutionResult::failure(e.to_string()),
                        };
                    }
                    Ok(None) => {}
                    Err(e) => return ExecutionResult::failure(e.to_string()),
                }

                let check = VisibleText::new(items, text.clone(), on_found);
                let search = RepeatSwipe::new(
                    container,
                    direction,
                    self.config.gesture_span,
                    Arc::new(check),
                );
                match ctx.run(&search).await {
                    Ok(report) if report.is_found() => {
                        ExecutionResult::success(format!("Scrolled to '{text}'")).with_json(&report)
                    }
                    Ok(report) => ExecutionResult::failure(format!(
                        "'{text}' not found after {} swipes",
                        report.state.gestures
                    ))
                    .with_json(&report),
                    Err(e) => ExecutionResult::failure(e.to_string()),
                }
            }

            ActionType::SelectValue {
                container,
                items,
                value,
                choices,
            } => {
                let ctx = self.context();
                let wheel = WheelPicker::new(container).with_items(items);
                let result = match choices {
                    Some(choices) => wheel.select_choice(&ctx, choices, &value).await,
                    None => match value.trim().parse::<i64>() {
                        Ok(n) => wheel.select_number(&ctx, n).await,
                        Err(_) => {
                            return ExecutionResult::failure(format!(
                                "'{value}' is not a number; pass the list of choices to select it"
                            ))
                        }
                    },
                };
                match result {
                    Ok(report) => {
                        ExecutionResult::success(format!("Selected '{value}'")).with_json(&report)
                    }
                    Err(e) => ExecutionResult::failure(e.to_string()),
                }
            }

            ActionType::SelectDate {
                day,
                month,
                year,
                date,
            } => {
                let picker = DatePicker::new(
                    WheelPicker::new(day),
                    WheelPicker::new(month),
                    WheelPicker::new(year),
                );
                match picker.select_date(&self.context(), date).await {
                    Ok(reports) => {
                        ExecutionResult::success(format!("Selected date {date}")).with_json(&reports)
                    }
                    Err(e) => ExecutionResult::failure(e.to_string()),
                }
            }

            ActionType::SelectTime { hour, minute, time } => {
                let picker = TimePicker::new(WheelPicker::new(hour), WheelPicker::new(minute));
                match picker.select_time(&self.context(), time).await {
                    Ok(reports) => ExecutionResult::success(format!(
                        "Selected time {}",
                        time.format("%H:%M")
                    ))
                    .with_json(&reports),
                    Err(e) => ExecutionResult::failure(e.to_string()),
                }
            }
        }
    }

    async fn tap_typed(
        &self,
        selector: &str,
        by_label: bool,
        element_type: &str,
    ) -> Result<(), DriverError> {
        let element = self
            .driver
            .find_element(selector, by_label, Some(element_type))
            .await?
            .ok_or_else(|| {
                DriverError::CommandFailed(format!("{element_type} '{selector}' not found"))
            })?;
        // Elements partly off screen are tapped on their visible part.
        let screen = self
            .driver
            .dump_tree()
            .await?
            .iter()
            .find_map(|root| root.frame);
        let frame = match (element.frame, screen) {
            (Some(frame), Some(screen)) => frame.intersection(&screen),
            (frame, None) => frame,
            (None, Some(_)) => None,
        };
        match (frame, &element.identifier) {
            (Some(frame), _) => {
                let (x, y) = frame.center();
                self.driver
                    .tap_location(x.round() as i32, y.round() as i32)
                    .await
            }
            (None, Some(id)) => self.driver.tap_element(id).await,
            (None, None) => self.driver.tap_by_label(selector).await,
        }
    }

    /// One swipe inside `container`, or inside the first root element's
    /// frame when no container is given.
    async fn swipe(
        &self,
        direction: Direction,
        container: Option<&ContainerLocator>,
    ) -> Result<(), String> {
        let bounds = match container {
            Some(locator) => {
                self.context()
                    .query()
                    .resolve_container(locator)
                    .await
                    .map_err(|e| e.to_string())?
                    .ok_or_else(|| format!("container {locator} not found"))?
                    .frame
            }
            None => self
                .driver
                .dump_tree()
                .await
                .map_err(|e| e.to_string())?
                .iter()
                .find_map(|root| root.frame)
                .ok_or_else(|| "screen bounds unavailable".to_string())?,
        };
        let gesture = SwipeGesture::new(direction, self.config.gesture_span, self.config.gesture_duration);
        GestureExecutor::new(self.driver.clone())
            .execute(&bounds, &gesture)
            .await
            .map_err(|e| e.to_string())
    }
}

