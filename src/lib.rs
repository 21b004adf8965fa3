pub mod app;
pub mod batch;
pub mod config;
pub mod correspondence;
pub mod domain;
pub mod error;
pub mod exiobase;
pub mod fs_util;
pub mod geo;
pub mod iot;
pub mod matrix;
pub mod output;
pub mod render;
pub mod server;
pub mod store;
