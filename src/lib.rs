pub mod api;
pub mod auth;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod data_models;
pub mod error;
pub mod render;
pub mod state;
pub mod widget;
