//! [`AutomationDriver`] backed by the on-device agent over TCP.
//!
//! # Example
//!
//! ```no_run
//! use swipeseek_core::agent_driver::AgentDriver;
//! use swipeseek_core::driver::AutomationDriver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut driver = AgentDriver::new("localhost", 9800);
//! driver.connect().await?;
//! let tree = driver.dump_tree().await?;
//! println!("{} root elements", tree.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::agent_client::{AgentClient, AgentClientError};
use crate::driver::{AutomationDriver, DriverConfig, DriverError};
use crate::element::UIElement;
use crate::protocol::{Request, Response};

fn map_client_error(err: AgentClientError) -> DriverError {
    match err {
        AgentClientError::NotConnected => DriverError::NotConnected,
        AgentClientError::ConnectionFailed(msg) => DriverError::ConnectionLost(msg),
        AgentClientError::Io(e) => DriverError::Io(e),
        AgentClientError::Protocol(e) => DriverError::CommandFailed(e.to_string()),
        AgentClientError::AgentError(msg) => DriverError::CommandFailed(msg),
        AgentClientError::Timeout => DriverError::Timeout,
    }
}

fn expect_ok(response: Response) -> Result<(), DriverError> {
    match response {
        Response::Ok => Ok(()),
        other => Err(DriverError::CommandFailed(format!(
            "unexpected response: {other:?}"
        ))),
    }
}

/// Driver that forwards every command to the agent.
///
/// The client sits behind a [`tokio::sync::Mutex`]: the agent handles one
/// command at a time, and `&self` trait methods need mutable access to send.
pub struct AgentDriver {
    host: String,
    port: u16,
    client: Mutex<Option<AgentClient>>,
}

impl AgentDriver {
    /// Creates a driver for `host:port`. Call [`connect`](AutomationDriver::connect) before use.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client: Mutex::new(None),
        }
    }

    /// Creates a driver from a [`DriverConfig`].
    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new(config.host.clone(), config.port)
    }

    /// Configured agent host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Configured agent port.
    pub fn port(&self) -> u16 {
        self.port
    }

    async fn send(&self, request: &Request) -> Result<Response, DriverError> {
        let mut guard = self.client.lock().await;
        let client = guard.as_mut().ok_or(DriverError::NotConnected)?;
        client.send(request).await.map_err(map_client_error)
    }
}

#[async_trait]
impl AutomationDriver for AgentDriver {
    #[instrument(skip(self), level = "debug")]
    async fn connect(&mut self) -> Result<(), DriverError> {
        let host_port = format!("{}:{}", self.host, self.port);
        let addr = tokio::net::lookup_host(&host_port)
            .await
            .map_err(|e| DriverError::ConnectionLost(e.to_string()))?
            .next()
            .ok_or_else(|| DriverError::ConnectionLost(format!("could not resolve {host_port}")))?;

        let mut client = AgentClient::new(addr);
        client.connect().await.map_err(map_client_error)?;
        client.heartbeat().await.map_err(map_client_error)?;

        *self.client.lock().await = Some(client);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        // A held lock means a command is in flight, so the client exists.
        self.client
            .try_lock()
            .map(|guard| guard.as_ref().is_some_and(AgentClient::is_connected))
            .unwrap_or(true)
    }

    #[instrument(skip(self), level = "debug")]
    async fn tap_location(&self, x: i32, y: i32) -> Result<(), DriverError> {
        expect_ok(self.send(&Request::TapCoord { x, y }).await?)
    }

    #[instrument(skip(self), level = "debug")]
    async fn tap_element(&self, identifier: &str) -> Result<(), DriverError> {
        expect_ok(
            self.send(&Request::TapElement {
                selector: identifier.to_string(),
            })
            .await?,
        )
    }

    #[instrument(skip(self), level = "debug")]
    async fn tap_by_label(&self, label: &str) -> Result<(), DriverError> {
        expect_ok(
            self.send(&Request::TapByLabel {
                label: label.to_string(),
            })
            .await?,
        )
    }

    #[instrument(skip(self), level = "debug")]
    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration: Option<f64>,
    ) -> Result<(), DriverError> {
        expect_ok(
            self.send(&Request::Swipe {
                start_x,
                start_y,
                end_x,
                end_y,
                duration,
            })
            .await?,
        )
    }

    #[instrument(skip(self), level = "debug")]
    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError> {
        match self.send(&Request::DumpTree).await? {
            Response::Tree { json } => {
                // Some agents send a single root object rather than an array.
                if json.trim_start().starts_with('{') {
                    let root: UIElement = serde_json::from_str(&json)
                        .map_err(|e| DriverError::JsonParse(e.to_string()))?;
                    Ok(vec![root])
                } else {
                    serde_json::from_str(&json).map_err(|e| DriverError::JsonParse(e.to_string()))
                }
            }
            other => Err(DriverError::CommandFailed(format!(
                "unexpected response to dump_tree: {other:?}"
            ))),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn find_element(
        &self,
        selector: &str,
        by_label: bool,
        element_type: Option<&str>,
    ) -> Result<Option<UIElement>, DriverError> {
        let request = Request::FindElement {
            selector: selector.to_string(),
            by_label,
            element_type: element_type.map(String::from),
        };
        match self.send(&request).await? {
            Response::Element { json } => {
                serde_json::from_str::<Option<UIElement>>(&json)
                    .map_err(|e| DriverError::JsonParse(e.to_string()))
            }
            other => Err(DriverError::CommandFailed(format!(
                "unexpected response to find_element: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_driver_is_disconnected() {
        let driver = AgentDriver::new("localhost", 9800);
        assert!(!driver.is_connected());
        assert_eq!(driver.host(), "localhost");
        assert_eq!(driver.port(), 9800);
    }

    #[test]
    fn from_config_copies_endpoint() {
        let config = DriverConfig {
            host: "10.0.0.2".into(),
            port: 8100,
        };
        let driver = AgentDriver::from_config(&config);
        assert_eq!(driver.host(), "10.0.0.2");
        assert_eq!(driver.port(), 8100);
    }

    #[tokio::test]
    async fn commands_before_connect_fail() {
        let driver = AgentDriver::new("localhost", 9800);
        assert!(matches!(
            driver.swipe(0, 10, 0, 0, None).await,
            Err(DriverError::NotConnected)
        ));
    }

    #[test]
    fn agent_errors_map_to_command_failed() {
        let err = map_client_error(AgentClientError::AgentError("obscured".into()));
        assert!(matches!(err, DriverError::CommandFailed(ref m) if m == "obscured"));
        assert!(matches!(
            map_client_error(AgentClientError::Timeout),
            DriverError::Timeout
        ));
    }
}
