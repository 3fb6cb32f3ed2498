pub mod commands;
pub mod display;
pub mod events;
pub mod handlers;
pub mod templates;
