pub mod calendar;
pub mod config;
pub mod fetch;
pub mod gtfs_rt;
pub mod localize;
pub mod parser;
pub mod pipeline;
pub mod publish;
pub mod relevance;
pub mod routes;
pub mod stats;
pub mod temporal;
