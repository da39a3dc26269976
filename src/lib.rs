pub mod app;
pub mod client;
pub mod config;
pub mod objects;
pub mod profile;
pub mod session;
pub mod utils;
pub mod web;
