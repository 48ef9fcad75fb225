//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Logger setup
//! - Wall-clock time (only used outside the simulation)
//! - The default local store

use crate::storage::StorageError;

/// Install the logger for this target. Safe to call more than once.
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::debug!("Logger already initialized");
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}

/// Milliseconds since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn unix_time_ms() -> u64 {
    js_sys::Date::now() as u64
}

#[cfg(not(target_arch = "wasm32"))]
pub fn unix_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Default persistent store for this target
#[cfg(target_arch = "wasm32")]
pub fn default_store() -> Result<crate::storage::LocalStore, StorageError> {
    Ok(crate::storage::LocalStore)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn default_store() -> Result<crate::storage::FileStore, StorageError> {
    crate::storage::FileStore::in_data_dir(crate::consts::APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_time_is_after_2020() {
        assert!(unix_time_ms() > 1_577_836_800_000);
    }
}
