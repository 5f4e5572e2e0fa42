use std::ffi::CString;
use std::sync::MutexGuard;

use secam_fire_core::SecamFire;
use tracing::warn;

use crate::error::{with_last_error_mut, DefaultSecamFireError, SecamFireError, SecamFireErrorCode};
use crate::instance::SecamFireInstance;

/// Set the thread-local error message and code.
/// Internal helper for FFI functions to record failure details.
/// Accepts any type implementing `SecamFireError` trait.
pub(crate) fn set_last_error(error: &impl SecamFireError) {
    warn!(code = ?error.code(), "{}", error.msg());
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl SecamFireError) -> SecamFireErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result, clear the last error on success.
pub(crate) fn track_result<T>(
    result: Result<T, DefaultSecamFireError>,
) -> Result<T, SecamFireErrorCode> {
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error)),
    }
}

/// Clear the thread-local error message and code.
/// Internal helper called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = SecamFireErrorCode::Ok;
    });
}

/// Borrow the instance behind a host handle.
///
/// # Safety
/// `ptr` must be null or a pointer returned by `f0r_construct` that has not
/// been passed to `f0r_destruct`.
pub(crate) unsafe fn instance_from_ptr<'a>(
    ptr: *const SecamFireInstance,
) -> Result<&'a SecamFireInstance, DefaultSecamFireError> {
    // SAFETY: caller guarantees the pointer is null or live
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultSecamFireError::null_pointer("instance"))
}

/// Lock the effect for exclusive use.
pub(crate) fn lock_effect(
    instance: &SecamFireInstance,
) -> Result<MutexGuard<'_, SecamFire>, DefaultSecamFireError> {
    instance
        .effect
        .lock()
        .map_err(|_| DefaultSecamFireError::lock_poisoned("effect"))
}

/// Run `func` with exclusive access to the effect.
pub(crate) fn with_effect_mut<F, T>(
    instance: &SecamFireInstance,
    func: F,
) -> Result<T, DefaultSecamFireError>
where
    F: FnOnce(&mut SecamFire) -> T,
{
    let mut effect = lock_effect(instance)?;
    Ok(func(&mut effect))
}
