//! Automation driver trait: the session conduit to one device.
//!
//! [`AutomationDriver`] is the seam between the swipe-search engine and a
//! concrete backend. The engine only needs a handful of primitives (tap,
//! swipe, tree dump); element lookups have default implementations that search
//! a fresh tree dump locally, and backends with server-side search can
//! override them.

use async_trait::async_trait;
use thiserror::Error;

use crate::element::UIElement;

/// Errors from a driver backend, unified across backends.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The device rejected or failed to run a command.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The backend is not connected.
    #[error("Not connected to automation backend")]
    NotConnected,

    /// The connection to the agent was lost.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// An operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The agent sent JSON that could not be parsed.
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl DriverError {
    /// Returns true for errors that mean the session itself is gone, as
    /// opposed to a single command being refused.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DriverError::NotConnected | DriverError::ConnectionLost(_) | DriverError::Io(_)
        )
    }
}

/// Connection settings for the agent backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Hostname or IP address of the agent.
    pub host: String,
    /// TCP port the agent listens on.
    pub port: u16,
}

/// Matches `text` against a glob `pattern` with `*` and `?` wildcards.
///
/// Without wildcards this is plain equality.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains(['*', '?']) {
        return pattern == text;
    }

    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();

    // prev[j]: pattern[..i-1] matches text[..j]
    let mut prev = vec![false; txt.len() + 1];
    prev[0] = true;
    for &p in &pat {
        let mut cur = vec![false; txt.len() + 1];
        cur[0] = p == '*' && prev[0];
        for j in 1..=txt.len() {
            cur[j] = match p {
                '*' => prev[j] || cur[j - 1],
                '?' => prev[j - 1],
                c => prev[j - 1] && c == txt[j - 1],
            };
        }
        prev = cur;
    }
    prev[txt.len()]
}

/// Depth-first search for the first element matching a selector.
pub fn find_in_tree<'a>(
    elements: &'a [UIElement],
    selector: &str,
    by_label: bool,
    element_type: Option<&str>,
) -> Option<&'a UIElement> {
    for element in elements {
        let field = if by_label {
            element.label.as_deref()
        } else {
            element.identifier.as_deref()
        };
        let selector_matches = field.is_some_and(|f| glob_match(selector, f));
        let type_matches = element_type.map_or(true, |t| element.element_type.as_deref() == Some(t));

        if selector_matches && type_matches {
            return Some(element);
        }
        if let Some(found) = find_in_tree(&element.children, selector, by_label, element_type) {
            return Some(found);
        }
    }
    None
}

/// Backend-agnostic device automation.
///
/// All device interaction is async; implementors must be shareable across
/// tasks so one driver can back several independent searches.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Establishes the connection to the backend.
    async fn connect(&mut self) -> Result<(), DriverError>;

    /// Returns true if the backend can accept commands.
    fn is_connected(&self) -> bool;

    /// Taps at screen coordinates.
    async fn tap_location(&self, x: i32, y: i32) -> Result<(), DriverError>;

    /// Taps an element by accessibility identifier.
    async fn tap_element(&self, identifier: &str) -> Result<(), DriverError>;

    /// Taps an element by accessibility label.
    async fn tap_by_label(&self, label: &str) -> Result<(), DriverError>;

    /// Performs a single-finger swipe.
    ///
    /// # Arguments
    ///
    /// * `start_x`, `start_y` - Where the finger lands
    /// * `end_x`, `end_y` - Where the finger lifts
    /// * `duration` - Optional stroke duration in seconds
    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration: Option<f64>,
    ) -> Result<(), DriverError>;

    /// Returns the root elements of the current accessibility tree.
    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError>;

    /// Finds one element by identifier or label, optionally filtered by type.
    ///
    /// The default implementation dumps the tree and searches it locally.
    async fn find_element(
        &self,
        selector: &str,
        by_label: bool,
        element_type: Option<&str>,
    ) -> Result<Option<UIElement>, DriverError> {
        let tree = self.dump_tree().await?;
        Ok(find_in_tree(&tree, selector, by_label, element_type).cloned())
    }
}
