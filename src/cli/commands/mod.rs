pub mod config;
pub mod health;
pub mod secret;
pub mod tenants;
pub mod token;
