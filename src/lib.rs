pub mod config;
pub mod fs;
pub mod humanize;
pub mod observability;
pub mod versioner;
