//! Wheel, date and time pickers built on [`SmartSearch`].
//!
//! Each wheel is a separate virtualized container. A date or time is set
//! one wheel at a time, most significant first, because some platforms
//! re-render the lower wheels when a higher one changes (day count per
//! month, for instance).

use std::sync::Arc;

use chrono::{Datelike, Month, NaiveDate, NaiveTime, Timelike};
use thiserror::Error;
use tracing::info;

use crate::locator::{ContainerLocator, ItemLocator};
use crate::search::{
    SearchContext, SearchError, SearchReport, SmartSearch, SwipeRatio, TapItem,
};
use crate::target::{ChoiceTarget, NumericTarget, TargetError, TargetSpec};

/// Errors from setting a picker.
#[derive(Error, Debug)]
pub enum PickerError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("'{value}' not found on wheel {wheel}")]
    NotFound { wheel: String, value: String },
}

/// English month names, January first.
pub fn month_names() -> Vec<String> {
    (1..=12u8)
        .filter_map(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .collect()
}

/// One spinning wheel.
#[derive(Debug, Clone)]
pub struct WheelPicker {
    container: ContainerLocator,
    items: ItemLocator,
    ratio: SwipeRatio,
}

impl WheelPicker {
    /// A wheel whose items are any text descendants, swiped one screen per
    /// estimated page.
    pub fn new(container: ContainerLocator) -> Self {
        Self {
            container,
            items: ItemLocator::any(),
            ratio: SwipeRatio::PerVisibleItem,
        }
    }

    pub fn with_items(mut self, items: ItemLocator) -> Self {
        self.items = items;
        self
    }

    pub fn with_ratio(mut self, ratio: SwipeRatio) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn container(&self) -> &ContainerLocator {
        &self.container
    }

    /// Scrolls to `target` and taps it.
    pub async fn select(
        &self,
        ctx: &SearchContext,
        target: Arc<dyn TargetSpec>,
    ) -> Result<SearchReport, PickerError> {
        let value = target.match_text().to_string();
        let search = SmartSearch::new(
            self.container.clone(),
            self.items.clone(),
            target,
            self.ratio,
            Arc::new(TapItem::new(ctx.driver().clone())),
        );
        let report = ctx.run(&search).await?;
        if !report.is_found() {
            return Err(PickerError::NotFound {
                wheel: self.container.to_string(),
                value,
            });
        }
        info!(wheel = %self.container, %value, "wheel set");
        Ok(report)
    }

    /// Selects a plain number.
    pub async fn select_number(
        &self,
        ctx: &SearchContext,
        value: i64,
    ) -> Result<SearchReport, PickerError> {
        self.select(ctx, Arc::new(NumericTarget::new(value))).await
    }

    /// Selects `value` from an ordered list of labels.
    pub async fn select_choice(
        &self,
        ctx: &SearchContext,
        choices: Vec<String>,
        value: &str,
    ) -> Result<SearchReport, PickerError> {
        let target = ChoiceTarget::new(choices, value)?;
        self.select(ctx, Arc::new(target)).await
    }
}

/// Day / month / year wheels.
#[derive(Debug, Clone)]
pub struct DatePicker {
    day: WheelPicker,
    month: WheelPicker,
    year: WheelPicker,
    month_labels: Vec<String>,
}

impl DatePicker {
    /// Month wheel labels default to English month names.
    pub fn new(day: WheelPicker, month: WheelPicker, year: WheelPicker) -> Self {
        Self {
            day,
            month,
            year,
            month_labels: month_names(),
        }
    }

    /// Replaces the month labels (twelve entries, January first).
    pub fn with_month_labels(mut self, labels: Vec<String>) -> Self {
        self.month_labels = labels;
        self
    }

    /// Sets year, then month, then day.
    pub async fn select_date(
        &self,
        ctx: &SearchContext,
        date: NaiveDate,
    ) -> Result<Vec<SearchReport>, PickerError> {
        let month_label = self
            .month_labels
            .get(date.month0() as usize)
            .cloned()
            .ok_or_else(|| TargetError::UnknownChoice(date.month().to_string()))?;

        let year = self.year.select_number(ctx, i64::from(date.year())).await?;
        let month = self
            .month
            .select_choice(ctx, self.month_labels.clone(), &month_label)
            .await?;
        let day = self.day.select_number(ctx, i64::from(date.day())).await?;
        Ok(vec![year, month, day])
    }
}

/// Hour / minute wheels on a 24-hour clock.
#[derive(Debug, Clone)]
pub struct TimePicker {
    hour: WheelPicker,
    minute: WheelPicker,
    pad_hour: bool,
}

impl TimePicker {
    /// Minutes are shown zero-padded ("07"); hours are not unless
    /// [`pad_hours`](Self::pad_hours) is set.
    pub fn new(hour: WheelPicker, minute: WheelPicker) -> Self {
        Self {
            hour,
            minute,
            pad_hour: false,
        }
    }

    pub fn pad_hours(mut self) -> Self {
        self.pad_hour = true;
        self
    }

    /// Sets hour, then minute.
    pub async fn select_time(
        &self,
        ctx: &SearchContext,
        time: NaiveTime,
    ) -> Result<Vec<SearchReport>, PickerError> {
        let (h, m) = (time.hour(), time.minute());
        let hour_text = if self.pad_hour {
            format!("{h:02}")
        } else {
            h.to_string()
        };

        let hour = self
            .hour
            .select(ctx, Arc::new(NumericTarget::with_text(f64::from(h), hour_text)))
            .await?;
        let minute = self
            .minute
            .select(
                ctx,
                Arc::new(NumericTarget::with_text(f64::from(m), format!("{m:02}"))),
            )
            .await?;
        Ok(vec![hour, minute])
    }
}
