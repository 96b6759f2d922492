// Library for tests to access modules

pub mod config;
pub mod event;
pub mod extract;
pub mod filter;
pub mod flush_worker;
pub mod models;
pub mod stats;
pub mod stats_repo;
