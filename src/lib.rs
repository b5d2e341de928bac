#![doc = include_str!("RUSTDOC.md")]

pub mod config;
pub mod favorites;
pub mod geocode;
pub mod identity;
pub mod listings;
pub mod logger;
pub mod platform;
pub mod store;
pub mod util;
