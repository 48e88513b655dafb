//! # swipeseek-core
//!
//! Finds items inside virtualized scrollable containers on a mobile device
//! (date and time spinners, choice wheels, long lists), where only the
//! items currently on screen exist in the accessibility tree.
//!
//! The device is reached through an [`AutomationDriver`](driver::AutomationDriver);
//! [`AgentDriver`](agent_driver::AgentDriver) talks to an on-device agent
//! over TCP using the binary protocol in [`protocol`].
//!
//! ## Modules
//!
//! - [`search`] - The swipe-search engine: repeat-swipe loop and smart search
//! - [`gesture`] - Direction model and gesture executor
//! - [`query`] - Element query facade over tree dumps
//! - [`locator`] - Container and item locators
//! - [`target`] - Numeric mappings for search targets
//! - [`picker`] - Wheel, date and time pickers
//! - [`action`] / [`executor`] - Scriptable actions and their execution
//! - [`driver`] / [`agent_driver`] / [`agent_client`] / [`protocol`] - Device access
//! - [`config`] - Persistent settings

pub mod action;
pub mod agent_client;
pub mod agent_driver;
pub mod config;
pub mod driver;
pub mod element;
pub mod executor;
pub mod gesture;
pub mod locator;
pub mod picker;
pub mod protocol;
pub mod query;
pub mod search;
pub mod target;
