pub mod diesel;
pub mod redis;
