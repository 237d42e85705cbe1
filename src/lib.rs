pub mod auth;
pub mod batch;
pub mod cli;
pub mod config;
pub mod event;
pub mod ingest;
pub mod pipeline;
pub mod source;
