//! budget-stats - Budget proposal statistics
//!
//! Fetches passed budget proposals, legislators and budget years from the
//! upstream GraphQL API, aggregates them per budget year by legislator or
//! by government department, and exposes the results over HTTP, on the
//! command line and as published JSON objects.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod models;
pub mod publish;
pub mod report;
pub mod server;
pub mod service;
pub mod source;
