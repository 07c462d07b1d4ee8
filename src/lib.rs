pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod filter;
pub mod fs_util;
pub mod output;
pub mod pager;
pub mod reconcile;
pub mod report;
