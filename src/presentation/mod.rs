// Presentation layer - HTTP handlers and error mapping
pub mod api_error;
pub mod app_state;
pub mod handlers;
