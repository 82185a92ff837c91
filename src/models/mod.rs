//! Data models for the meal board.
//!
//! The stored record uses the snake_case keys the database already holds.

mod meal;

pub use meal::*;
