#[path = "suite.rs"]
pub mod suite;

#[path = "memory_tests.rs"]
mod memory_tests;

#[path = "filesystem_tests.rs"]
mod filesystem_tests;

#[path = "remote_kv_tests.rs"]
mod remote_kv_tests;
