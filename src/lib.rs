pub mod api;
pub mod assistant;
pub mod check_in;
pub mod config;
pub mod crisis;
pub mod entities;
pub mod metrics;
pub mod migrator;
pub mod models;
pub mod openai;
pub mod storage;
pub mod telemetry;

pub use sea_orm;
