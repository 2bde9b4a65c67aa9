#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod config;
mod engine;
mod error;
mod map;
mod slot;
mod sync;
mod table;

pub use config::*;
pub use error::*;
pub use map::*;
