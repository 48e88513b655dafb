//! Target specifications: what a smart search is looking for.
//!
//! A [`TargetSpec`] puts the target and every visible item into one numeric
//! space so the engine can tell which way to swipe and how far. The mapping
//! must increase along the container's on-screen order; the engine relies
//! on it but cannot check it.

use thiserror::Error;

/// Errors from mapping text into the numeric space.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// The item text has no numeric reading.
    #[error("cannot read a value from '{0}'")]
    Unparseable(String),

    /// The requested value is not one of the known choices.
    #[error("'{0}' is not one of the available choices")]
    UnknownChoice(String),
}

/// The value a search is looking for, plus its mapping functions.
pub trait TargetSpec: Send + Sync {
    /// Maps an item's display text to a comparable value.
    fn item_value(&self, text: &str) -> Result<f64, TargetError>;

    /// The target's own value in the same space.
    fn target_value(&self) -> f64;

    /// Exact display text of the item to select.
    fn match_text(&self) -> &str;
}

/// Reads the first number embedded in `text`.
///
/// Accepts an optional leading minus sign and a decimal part, so "07",
/// "2024", "-3" and "Item 62" all parse. A hyphen after a letter or digit
/// is a separator, not a sign.
pub fn extract_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    // A minus sign counts only when it does not join a word to the number,
    // so "Row-62" reads as 62.
    let signed = start > 0
        && bytes[start - 1] == b'-'
        && (start == 1 || !bytes[start - 2].is_ascii_alphanumeric());
    let start = if signed {
        start - 1
    } else {
        start
    };

    let mut end = start + 1;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => {}
            b'.' if !seen_dot && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) => {
                seen_dot = true;
            }
            _ => break,
        }
        end += 1;
    }
    text[start..end].parse().ok()
}

/// A target on a numeric wheel or list (days, years, minutes, row numbers).
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTarget {
    value: f64,
    text: String,
}

impl NumericTarget {
    /// Targets `value`, matched by its plain decimal rendering.
    pub fn new(value: i64) -> Self {
        Self {
            value: value as f64,
            text: value.to_string(),
        }
    }

    /// Targets `value`, matched by a custom rendering such as "07".
    pub fn with_text(value: f64, text: impl Into<String>) -> Self {
        Self {
            value,
            text: text.into(),
        }
    }
}

impl TargetSpec for NumericTarget {
    fn item_value(&self, text: &str) -> Result<f64, TargetError> {
        extract_number(text).ok_or_else(|| TargetError::Unparseable(text.to_string()))
    }

    fn target_value(&self) -> f64 {
        self.value
    }

    fn match_text(&self) -> &str {
        &self.text
    }
}

/// A target on a wheel of ordered labels (month names, named options).
///
/// An item's value is its position in the choice list.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceTarget {
    choices: Vec<String>,
    index: usize,
}

impl ChoiceTarget {
    /// Targets `value` among `choices`, listed in on-screen order.
    pub fn new(choices: Vec<String>, value: &str) -> Result<Self, TargetError> {
        let index = position_of(&choices, value)
            .ok_or_else(|| TargetError::UnknownChoice(value.to_string()))?;
        Ok(Self { choices, index })
    }

    /// The choices, in order.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }
}

fn position_of(choices: &[String], text: &str) -> Option<usize> {
    choices
        .iter()
        .position(|c| c == text)
        .or_else(|| choices.iter().position(|c| c.eq_ignore_ascii_case(text.trim())))
}

impl TargetSpec for ChoiceTarget {
    fn item_value(&self, text: &str) -> Result<f64, TargetError> {
        position_of(&self.choices, text)
            .map(|i| i as f64)
            .ok_or_else(|| TargetError::Unparseable(text.to_string()))
    }

    fn target_value(&self) -> f64 {
        self.index as f64
    }

    fn match_text(&self) -> &str {
        &self.choices[self.index]
    }
}

/// A target built from a caller-supplied mapping closure.
pub struct FnTarget<F> {
    value: f64,
    text: String,
    map: F,
}

impl<F> FnTarget<F>
where
    F: Fn(&str) -> Option<f64> + Send + Sync,
{
    /// Targets the item displayed as `text`, whose value is `value`.
    pub fn new(value: f64, text: impl Into<String>, map: F) -> Self {
        Self {
            value,
            text: text.into(),
            map,
        }
    }
}

impl<F> TargetSpec for FnTarget<F>
where
    F: Fn(&str) -> Option<f64> + Send + Sync,
{
    fn item_value(&self, text: &str) -> Result<f64, TargetError> {
        (self.map)(text).ok_or_else(|| TargetError::Unparseable(text.to_string()))
    }

    fn target_value(&self) -> f64 {
        self.value
    }

    fn match_text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_embedded_numbers() {
        assert_eq!(extract_number("62"), Some(62.0));
        assert_eq!(extract_number("07"), Some(7.0));
        assert_eq!(extract_number("Item 62"), Some(62.0));
        assert_eq!(extract_number("-3 °C"), Some(-3.0));
        assert_eq!(extract_number("1.5x"), Some(1.5));
        assert_eq!(extract_number("v2."), Some(2.0));
        assert_eq!(extract_number("March"), None);
        assert_eq!(extract_number("Row-62"), Some(62.0));
        assert_eq!(extract_number("2024-05"), Some(2024.0));
        assert_eq!(extract_number("Temp -3"), Some(-3.0));
        assert_eq!(extract_number("(-7)"), Some(-7.0));
        assert_eq!(extract_number(""), None);
    }

    #[test]
    fn numeric_target() {
        let t = NumericTarget::new(2024);
        assert_eq!(t.target_value(), 2024.0);
        assert_eq!(t.match_text(), "2024");
        assert_eq!(t.item_value("1999").unwrap(), 1999.0);
        assert_eq!(
            t.item_value("—"),
            Err(TargetError::Unparseable("—".into()))
        );

        let padded = NumericTarget::with_text(5.0, "05");
        assert_eq!(padded.match_text(), "05");
        assert_eq!(padded.item_value("05").unwrap(), 5.0);
    }

    #[test]
    fn choice_target_uses_positions() {
        let months: Vec<String> = ["January", "February", "March"].map(String::from).to_vec();
        let t = ChoiceTarget::new(months.clone(), "march").unwrap();
        assert_eq!(t.target_value(), 2.0);
        assert_eq!(t.match_text(), "March");
        assert_eq!(t.item_value("February").unwrap(), 1.0);
        assert!(t.item_value("Smarch").is_err());
        assert_eq!(
            ChoiceTarget::new(months, "Undecimber"),
            Err(TargetError::UnknownChoice("Undecimber".into()))
        );
    }

    #[test]
    fn fn_target_delegates_to_closure() {
        let t = FnTarget::new(3.0, "C", |s: &str| {
            s.chars().next().map(|c| f64::from(c as u8 - b'A'))
        });
        assert_eq!(t.item_value("A").unwrap(), 0.0);
        assert_eq!(t.target_value(), 3.0);
        assert!(t.item_value("").is_err());
    }
}
