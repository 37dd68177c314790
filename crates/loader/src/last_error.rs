use std::sync::{Mutex, MutexGuard};

use lazy_static::lazy_static;

use crate::error::LoaderError;

lazy_static! {
    /// The error of the most recent failing loader call, shared by the whole process.
    static ref LAST_ERROR: Mutex<Option<LoaderError>> = Mutex::new(None);
}

fn slot() -> MutexGuard<'static, Option<LoaderError>> {
    LAST_ERROR.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Returns the error of the most recent failing loader call and clears it, so each error is
/// reported once. Every loader call clears the slot on entry.
pub fn take_last_error() -> Option<LoaderError> {
    slot().take()
}

pub(crate) fn set_last_error(error: &LoaderError) {
    *slot() = Some(error.clone());
}

pub(crate) fn clear_last_error() {
    *slot() = None;
}

/// Runs one public loader call: clears the slot, then records the error if the call fails.
pub(crate) fn track<T>(call: impl FnOnce() -> Result<T, LoaderError>) -> Result<T, LoaderError> {
    clear_last_error();
    let result = call();
    if let Err(e) = &result {
        tracing::warn!("{}", e);
        set_last_error(e);
    }
    result
}
