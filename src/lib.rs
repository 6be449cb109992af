#![forbid(unsafe_code)]

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod context;
pub mod detail;
pub mod download;
pub mod error;
pub mod fetch;
pub mod formats;
pub mod harvest;
pub mod listing;
pub mod logging;
pub mod pages;
pub mod pool;
pub mod store;
