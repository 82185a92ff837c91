//! Meal form: field rules, editable state, and submit handling.

mod controller;
mod rules;
mod state;

pub use controller::*;
pub use rules::*;
pub use state::*;

/// UI actions the form triggers after a submit.
pub trait Navigator {
    /// Drop text-input focus and hide the keyboard.
    fn dismiss_keyboard(&mut self);
    /// Return to the list at the root of the stack.
    fn pop_to_top(&mut self);
    /// Show a blocking message.
    fn alert(&mut self, message: &str);
}
