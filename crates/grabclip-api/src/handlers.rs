//! Request handlers.

pub mod download;
pub mod health;
pub mod index;

pub use download::*;
pub use health::*;
pub use index::*;
