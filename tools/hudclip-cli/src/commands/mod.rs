pub mod check;
pub mod config;
pub mod job;
pub mod plan;
pub mod probe;
pub mod render;
