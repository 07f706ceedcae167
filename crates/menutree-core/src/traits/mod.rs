//! Core traits defined in `menutree-core` and implemented by other crates.

pub mod id_generator;

pub use id_generator::{IdGenerator, RandomIdGenerator};
