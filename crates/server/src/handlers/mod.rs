//! HTTP request handlers.

pub mod assets;
pub mod capabilities;
pub mod common;
pub mod uploads;

pub use assets::*;
pub use capabilities::*;
pub use uploads::*;
