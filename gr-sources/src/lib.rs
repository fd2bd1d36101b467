//! Session sources for GridReplay

pub mod demo;
pub mod json;

pub use demo::DemoSource;
pub use json::JsonSessionSource;
