pub mod app;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod output;
pub mod phenotips;
