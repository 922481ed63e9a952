//! Outcome shaping shared by every command handler.

pub(crate) mod outcome;
