//! Request handlers.

pub mod clips;
pub mod health;
pub mod recaps;
