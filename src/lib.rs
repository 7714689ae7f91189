// ABOUTME: Slack assistant relay: wires the Slack adapter to the threadline-core dispatcher.
// ABOUTME: Exposes the platform adapter, health server, logging setup, and startup wiring.

pub mod app;
pub mod logging;
pub mod platform;
pub mod server;

pub use threadline_core::config::Config;
