//! Fleet telemetry dashboard core for OWL units
//!
//! The [`poller::Poller`] reads the backend through a [`client::TelemetrySource`],
//! the [`controller::DashboardController`] merges results into the
//! [`store::TelemetryStore`] and keeps the rendered [`dom::HtmlDocument`] in sync
//! with telemetry and [`state::UiState`].

pub mod client;
pub mod color;
pub mod config;
pub mod controller;
pub mod dom;
pub mod health;
pub mod http;
pub mod models;
pub mod poller;
pub mod render;
pub mod state;
pub mod store;
