pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod paths;
pub mod stream;

pub use error::WeaveError;
