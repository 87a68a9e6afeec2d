//! Careers board — shared to-do board with likes and comments.

pub mod config;
pub mod error;
pub mod store;
pub mod todos;
