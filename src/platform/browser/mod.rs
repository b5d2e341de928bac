//! Browser bindings, compiled only for `wasm32` with the `wasm-web` feature.

mod navigator;

pub use navigator::WindowNavigator;
