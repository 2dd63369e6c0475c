pub mod auth;
pub mod config;
pub mod errors;
pub mod llm_client;
pub mod orm;
pub mod routes;
pub mod state;
