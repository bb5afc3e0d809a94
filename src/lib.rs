pub mod api;
pub mod config;
pub mod humanize;
pub mod media;
pub mod observability;
pub mod progress;
pub mod storage;
pub mod worker;
