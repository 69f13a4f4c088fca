pub mod chat;
pub mod dataset;
pub mod record;
pub mod user;
