// Library for tests to access modules

pub mod config;
pub mod error;
pub mod history_repo;
pub mod ingest;
pub mod maintenance;
pub mod models;
pub mod routes;
pub mod series;
