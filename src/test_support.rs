use std::sync::{Mutex, MutexGuard, OnceLock};

/// Tests that mutate process environment variables must hold this lock so
/// `Settings::load` calls do not race each other.
pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
