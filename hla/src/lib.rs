pub mod compile;
pub mod config;
pub mod cpu;
pub mod error;
pub mod eval;
pub mod grammer;
pub mod memory;
pub mod preprocess;
pub mod resolve;
pub mod symbols;
pub mod types;
