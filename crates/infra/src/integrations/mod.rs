//! External service integrations

pub mod tickets;
