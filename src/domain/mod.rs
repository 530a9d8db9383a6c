pub mod chunks;
pub mod connections;
pub mod documents;
pub mod integrations;
pub mod models;
pub mod sync;
