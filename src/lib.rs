pub mod channel;
pub mod error;
pub mod filter;
pub mod pin;
pub mod producer;
pub mod registry;
pub mod server;
