pub mod agent;
pub mod config;
pub mod errors;
pub mod models;
pub mod providers;
pub mod systems;
