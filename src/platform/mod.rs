pub mod runtime;
pub mod token;

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
pub mod browser;
