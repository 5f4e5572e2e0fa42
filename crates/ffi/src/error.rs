use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use secam_fire_core::FireError;

/// Common interface for FFI error types.
///
/// This trait provides a unified way to handle errors across the FFI boundary,
/// allowing both simple error codes and custom error messages.
///
/// # Design
/// - `code()` - Returns the error code to be passed across FFI boundary
/// - `msg()` - Returns the error message for diagnostic purposes
pub(crate) trait SecamFireError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> SecamFireErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `SecamFireError` for common FFI error scenarios.
///
/// This struct wraps a `SecamFireErrorCode` and provides convenient constructors
/// for each error type (except Ok, which represents success).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultSecamFireError {
    code: SecamFireErrorCode,
    msg: String,
}

impl DefaultSecamFireError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"instance"`, `"inframe"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: SecamFireErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    ///
    /// # Arguments
    /// * `lock_name` - The name of the lock that was poisoned (e.g., `"effect"`, `"noise field"`)
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: SecamFireErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for an unknown parameter index.
    pub fn invalid_parameter(index: i32) -> Self {
        Self {
            code: SecamFireErrorCode::InvalidParameter,
            msg: format!("Parameter index {index} is out of range"),
        }
    }

    /// Create error for `f0r_construct` called before `f0r_init`.
    pub fn not_initialized() -> Self {
        Self {
            code: SecamFireErrorCode::NotInitialized,
            msg: "Noise field not built: f0r_init must be called first".to_owned(),
        }
    }
}

impl From<FireError> for DefaultSecamFireError {
    fn from(error: FireError) -> Self {
        let code = match error {
            FireError::NoiseAllocation { .. } => SecamFireErrorCode::AllocationFailed,
            FireError::InvalidDimensions { .. } => SecamFireErrorCode::InvalidDimensions,
            FireError::FrameSize { .. } | FireError::PlaneSize { .. } => {
                SecamFireErrorCode::FrameSize
            }
            FireError::UnknownParam(_) => SecamFireErrorCode::InvalidParameter,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl SecamFireError for DefaultSecamFireError {
    fn code(&self) -> SecamFireErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes recorded by the plugin entry points.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecamFireErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Frame width and height must both be at least 2.
    InvalidDimensions = 3,

    /// Parameter index out of range.
    InvalidParameter = 4,

    /// Plugin used before `f0r_init` (or after `f0r_deinit`).
    NotInitialized = 5,

    /// The noise lattice could not be allocated.
    AllocationFailed = 6,

    /// Frame buffer does not match the instance size.
    FrameSize = 7,
}

impl From<DefaultSecamFireError> for SecamFireErrorCode {
    fn from(error: DefaultSecamFireError) -> Self {
        error.code
    }
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// frei0r entry points mostly return nothing, so this is the only way
    /// for a host to find out why a call did nothing.
    static LAST_ERROR: RefCell<(Option<CString>, SecamFireErrorCode)> = const { RefCell::new((None, SecamFireErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, SecamFireErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, SecamFireErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if an error occurred.
/// - `null` if no error has occurred or the error message cannot be converted to C string.
///
/// # Lifetime
/// The returned pointer is valid until the next plugin call on this thread
/// that sets or clears the error.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// f0r_instance_t fx = f0r_construct(width, height);
/// if (!fx) {
///     const char* error = secam_fire_get_last_error();
///     if (error) {
///         fprintf(stderr, "secamiz0r: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn secam_fire_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code.
///
/// Returns `SecamFireErrorCode::Ok` (0) if the last plugin call on this
/// thread succeeded.
#[no_mangle]
pub extern "C" fn secam_fire_get_last_error_code() -> SecamFireErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
