//! Meal Board
//!
//! A live list of meals kept in sync with a realtime database collection,
//! plus the form that creates and edits them.

pub mod config;
pub mod errors;
pub mod form;
pub mod keys;
pub mod models;
pub mod store;
pub mod subscriber;
pub mod view;
