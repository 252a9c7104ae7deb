pub mod app;
pub mod cli;
pub mod core;
pub mod infrastructure;
pub mod services;
