// Library exports for the binary and the integration tests
pub mod checker;
pub mod config;
pub mod facts;
pub mod handlers;
pub mod models;
pub mod server;
pub mod service;
pub mod update;
