pub mod activity_sync;
pub mod client;
pub mod models;
pub mod soap;
