// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod error;
pub mod exporter;
pub mod metrics_store;
pub mod models;
pub mod pipeline;
pub mod protocol;
pub mod rates;
pub mod routes;
pub mod version;
pub mod worker;
