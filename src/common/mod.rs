pub mod config;
pub mod notify;
pub mod package;
pub mod paths;
pub mod prompt;
pub mod sanitize;
pub mod time;
