pub mod config;
pub mod database;
pub mod errors;
pub mod infrastructure;
pub mod models;
pub mod repositories;
pub mod services;
pub mod startup;
pub mod utils;
