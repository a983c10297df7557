// Public API for integration tests and potential library usage

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod live;
pub mod state;
pub mod stomp;
pub mod types;
pub mod ui;
pub mod view;
pub mod visual;
