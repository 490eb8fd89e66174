pub mod config;
pub mod db;
pub mod input;
pub mod locks;
pub mod metrics;
pub mod model;
pub mod repository;
pub mod repository_memory;
pub mod repository_sqlx;
pub mod tracker;

pub mod error;
