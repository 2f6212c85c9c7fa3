//! Unit tests for basicdb
//!
//! This file serves as the entry point for all unit tests that exercise the
//! crate from outside (module-internal unit tests live next to their code
//! under `#[cfg(test)]`).

#[path = "unit/backend/mod.rs"]
mod backend;
