use std::ptr;
use std::sync::Mutex;

use secam_fire_core::SecamFire;
use tracing::debug;

use crate::error::DefaultSecamFireError;
use crate::helpers::{track_error, track_result};
use crate::shared_noise_field;

/// One effect instance as seen by the host.
///
/// # Thread Safety
/// frei0r hosts may call `f0r_update` and `f0r_set_param_value` for the same
/// instance from different threads. The effect sits behind a `Mutex`, so
/// those calls serialize instead of racing on the chroma planes.
///
/// Different instances share only the read-only noise field and can be
/// updated concurrently.
pub struct SecamFireInstance {
    pub(crate) effect: Mutex<SecamFire>,
}

/// Create an effect instance for frames of `width × height` pixels.
///
/// Returns null on failure. The reason is available through
/// `secam_fire_get_last_error`. Failure causes:
/// - `f0r_init` has not been called (`NotInitialized`)
/// - either dimension is below 2 (`InvalidDimensions`)
/// - the shared noise lock was poisoned (`LockPoisoned`)
///
/// The returned pointer must be released with `f0r_destruct`.
#[no_mangle]
pub extern "C" fn f0r_construct(width: u32, height: u32) -> *mut SecamFireInstance {
    let result = shared_noise_field().and_then(|field| {
        SecamFire::new(width, height, field).map_err(DefaultSecamFireError::from)
    });

    match track_result(result) {
        Ok(effect) => {
            debug!(width, height, "instance constructed");
            Box::into_raw(Box::new(SecamFireInstance {
                effect: Mutex::new(effect),
            }))
        }
        Err(_) => ptr::null_mut(),
    }
}

/// Release an instance created by `f0r_construct`.
///
/// Passing null is a no-op that records `NullPointer` as the last error.
///
/// # Safety
/// `instance` must be null or a pointer returned by `f0r_construct` that has
/// not already been destructed. It must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn f0r_destruct(instance: *mut SecamFireInstance) {
    if instance.is_null() {
        track_error(&DefaultSecamFireError::null_pointer("instance"));
        return;
    }

    // SAFETY: caller guarantees the pointer came from f0r_construct and is live
    let instance = unsafe { Box::from_raw(instance) };
    let frames = instance
        .effect
        .lock()
        .map_or(0, |effect| effect.frames_processed());
    debug!(frames, "instance destructed");
    drop(instance);
}
