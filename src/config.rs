//! Server configuration: CLI flags (via `clap::Parser`, matching the
//! teacher's derive style) with environment variable overrides, since this
//! binary is usually launched by a process supervisor rather than a human
//! typing flags.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(name = "basicdb")]
#[command(author, version, about = "A SimpleDB-style multi-valued attribute store with a SQL-like SELECT engine")]
pub struct Cli {
    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long, env = "BASICDB_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: String,

    /// Which storage backend to run against
    #[arg(long, value_enum, env = "BASICDB_BACKEND", default_value_t = Backend::Memory)]
    pub backend: Backend,

    /// Base directory for the filesystem backend
    #[arg(long, env = "BASICDB_DATA_DIR", default_value = "/tmp/basicdb")]
    pub data_dir: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Filesystem,
    RemoteKv,
}
