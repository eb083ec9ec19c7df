// Infrastructure module - External dependencies and adapters
pub mod config;
pub mod logfile;
pub mod logging;
pub mod serial;
pub mod tcp;
