pub mod app;
pub mod aws;
pub mod config;
pub mod dispatch;
pub mod extract;
pub mod handler;
pub mod model;
pub mod store;
pub mod telemetry;
pub mod workflow;
