pub mod assistant;
pub mod cache;
pub mod config;
pub mod date;
pub mod error;
pub mod feed;
pub mod logger;
pub mod models;
pub mod normalize;
pub mod profile;
pub mod render;
pub mod routes;
pub mod site;
pub mod store;
