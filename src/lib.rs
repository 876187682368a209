//! cardiopipe: heart-disease survey pipeline
//!
//! Cleans yearly BRFSS-style survey extracts, combines and bins them, trains a
//! soft-voting ensemble of five classifier families, and serves risk
//! predictions over HTTP.

pub mod cli;
pub mod model;
pub mod pipeline;
pub mod predictor;
pub mod report;
pub mod serve;
pub mod utils;
