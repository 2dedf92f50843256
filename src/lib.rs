// Picbox image transformation library

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod security;
pub mod service;
pub mod validator;
