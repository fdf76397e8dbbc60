pub mod auth;
pub mod cli;
pub mod collection_error;
pub mod config;
pub mod db;
pub mod fetch_error;
pub mod fetcher;
pub mod loaders;
pub mod rate_gate;
pub mod services;
pub mod shutdown;
pub mod window;
