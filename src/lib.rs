pub mod app;
pub mod batches;
pub mod config;
pub mod error;
pub mod foods;
pub mod input;
pub mod meals;
pub mod nutrition;
pub mod state;
pub mod store;
pub mod sync;
