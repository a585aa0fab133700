pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod distance;
pub mod error;
pub mod estimator;
pub mod models;
pub mod pagination;
pub mod report;

pub use config::Config;
pub use database::Database;
pub use estimator::{DistanceEstimator, EstimateError};
