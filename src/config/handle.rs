//! Global config handle.
//!
//! Uses `arc-swap` for lock-free reads from any thread.

use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;

use super::Config;

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<Config>> =
    LazyLock::new(|| ArcSwap::from_pointee(Config::default()));

#[inline]
pub fn cfg() -> Arc<Config> {
    CONFIG.load_full()
}

#[inline]
pub fn init_config(config: Config) -> Arc<Config> {
    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}
