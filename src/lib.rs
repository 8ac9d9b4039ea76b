pub mod auth;
pub mod browser;
pub mod cli;
pub mod config;
pub mod workflows;
