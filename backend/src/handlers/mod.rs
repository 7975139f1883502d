//! HTTP request handlers

pub mod diseases;
pub mod health;
pub mod prediction;
pub mod stores;

pub use diseases::{get_disease, list_diseases};
pub use health::health_check;
pub use prediction::predict;
pub use stores::{list_agro_stores, nearest_stores};
