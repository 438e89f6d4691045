// Infrastructure layer - configuration and upstream adapters
pub mod config;
pub mod metabase_repository;
pub mod session;
