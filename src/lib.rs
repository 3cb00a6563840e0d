// Library for tests to access modules

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod registry;
pub mod routes;
pub mod scheduler;
pub mod snapshot_repo;
pub mod stats_cache;
pub mod stats_computer;
pub mod validator;
