//! Core types shared across the relay crates.

pub mod enums;
pub mod stream;

pub use enums::*;
pub use stream::*;
