//! Operator input: the actions a front end can issue and the key table that
//! produces them.
//!
//! # Invariants
//! - Unbound keys resolve to [`Action::Noop`], never an error.
//! - Every front end maps its key codes onto [`Key`] and goes through the
//!   same [`KeyBindings`].

pub mod action;
pub mod bindings;

pub use action::Action;
pub use bindings::{InputError, Key, KeyBindings};

pub fn crate_info() -> &'static str {
    "ember-input v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("input"));
    }
}
