pub(crate) mod commands;
pub(crate) mod config;
pub(crate) mod engine;
pub(crate) mod remote;
pub(crate) mod runtime;
pub(crate) mod session;
pub(crate) mod store;
pub(crate) mod tooling;
