//! different utility modules used throughout the project
/// logger setup: terminal and optional file output
pub mod logger;
/// engine settings read from TOML
pub mod engine_config;
/// pretty-printing of iteration traces and ODE tables
pub mod trace_table;
