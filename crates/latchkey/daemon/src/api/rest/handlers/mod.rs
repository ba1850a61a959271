//! API request handlers

mod health;
mod token;

pub use health::*;
pub use token::*;
