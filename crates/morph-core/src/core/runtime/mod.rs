pub(crate) mod effects;

mod facade;

pub use facade::*;
