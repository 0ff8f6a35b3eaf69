// src/core/mod.rs

pub mod arg_parser;
pub mod color;
pub mod config_loader;
pub mod interrupt;
pub mod paths;
pub mod scope;
pub mod supervisor;
