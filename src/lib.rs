pub mod config;
pub mod csrf;
pub mod error;
pub mod form;
pub mod logger;
pub mod post;
pub mod server;
pub mod store;
mod text_utils;
pub mod view;
