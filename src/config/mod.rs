//! Layered configuration (defaults, YAML file, environment, flags).

pub mod schema;

pub use schema::SocialGraphConfig;
