//! frei0r host surface for the SECAM fire effect.
//!
//! Exposes the `f0r_*` entry points a frei0r host loads from a filter
//! plugin, plus `secam_fire_get_last_error` for diagnostics. The noise
//! lattice is built once by `f0r_init` and shared by every instance.

mod error;
mod helpers;
mod instance;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::{c_char, c_double, c_int};
use std::ptr;
use std::sync::{Arc, LazyLock, Mutex};

use secam_fire_core::{NoiseField, PARAMS};
use tracing::{debug, info};

pub use error::{secam_fire_get_last_error, secam_fire_get_last_error_code, SecamFireErrorCode};
use error::DefaultSecamFireError;
use helpers::{clear_last_error, instance_from_ptr, track_error, track_result, with_effect_mut};
pub use instance::{f0r_construct, f0r_destruct, SecamFireInstance};

// frei0r 1.x constants
pub const F0R_PLUGIN_TYPE_FILTER: c_int = 0;
pub const F0R_COLOR_MODEL_RGBA8888: c_int = 1;
pub const F0R_PARAM_DOUBLE: c_int = 1;
pub const FREI0R_MAJOR_VERSION: c_int = 1;

const PLUGIN_NAME: &CStr = c"secamiz0r";
const PLUGIN_AUTHOR: &CStr = c"Mineubob";
const PLUGIN_EXPLANATION: &CStr = c"SECAM fire: chroma flares bleeding along scanlines";
const PLUGIN_MAJOR_VERSION: c_int = 0;
const PLUGIN_MINOR_VERSION: c_int = 9;

/// Plugin description filled by `f0r_get_plugin_info`.
#[repr(C)]
#[allow(non_camel_case_types)]
pub struct f0r_plugin_info_t {
    pub name: *const c_char,
    pub author: *const c_char,
    pub plugin_type: c_int,
    pub color_model: c_int,
    pub frei0r_version: c_int,
    pub major_version: c_int,
    pub minor_version: c_int,
    pub num_params: c_int,
    pub explanation: *const c_char,
}

/// Parameter description filled by `f0r_get_param_info`.
#[repr(C)]
#[allow(non_camel_case_types)]
pub struct f0r_param_info_t {
    pub name: *const c_char,
    pub type_: c_int,
    pub explanation: *const c_char,
}

/// Process-wide noise field handle. Instances clone the `Arc`.
static NOISE_FIELD: Mutex<Option<Arc<NoiseField>>> = Mutex::new(None);

/// Parameter names and explanations as C strings, in host index order.
static PARAM_STRINGS: LazyLock<Vec<(CString, CString)>> = LazyLock::new(|| {
    PARAMS
        .iter()
        .map(|info| {
            (
                CString::new(info.name).unwrap_or_default(),
                CString::new(info.explanation).unwrap_or_default(),
            )
        })
        .collect()
});

/// Clone the shared noise field, or fail if `f0r_init` has not run.
pub(crate) fn shared_noise_field() -> Result<Arc<NoiseField>, DefaultSecamFireError> {
    let guard = NOISE_FIELD
        .lock()
        .map_err(|_| DefaultSecamFireError::lock_poisoned("noise field"))?;
    guard.clone().ok_or_else(DefaultSecamFireError::not_initialized)
}

fn param_index(index: c_int) -> Result<usize, DefaultSecamFireError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < PARAMS.len())
        .ok_or_else(|| DefaultSecamFireError::invalid_parameter(index))
}

/// Build the shared noise field.
///
/// Returns 1 on success and 0 if the lattice could not be allocated.
/// Calling it again while initialized keeps the existing field.
#[no_mangle]
pub extern "C" fn f0r_init() -> c_int {
    let result = NOISE_FIELD
        .lock()
        .map_err(|_| DefaultSecamFireError::lock_poisoned("noise field"))
        .and_then(|mut guard| {
            if guard.is_none() {
                let field = NoiseField::build().map_err(DefaultSecamFireError::from)?;
                info!(len = field.len(), "noise field built");
                *guard = Some(Arc::new(field));
            }
            Ok(())
        });

    c_int::from(track_result(result).is_ok())
}

/// Drop the process-wide noise field handle.
///
/// Live instances keep their own reference until they are destructed.
#[no_mangle]
pub extern "C" fn f0r_deinit() {
    match NOISE_FIELD.lock() {
        Ok(mut guard) => {
            if guard.take().is_some() {
                debug!("noise field released");
            }
            clear_last_error();
        }
        Err(_) => {
            track_error(&DefaultSecamFireError::lock_poisoned("noise field"));
        }
    }
}

/// Fill `info` with the plugin description.
///
/// # Safety
/// `info` must be null or point to writable memory for one `f0r_plugin_info_t`.
#[no_mangle]
pub unsafe extern "C" fn f0r_get_plugin_info(info: *mut f0r_plugin_info_t) {
    if info.is_null() {
        track_error(&DefaultSecamFireError::null_pointer("info"));
        return;
    }

    let filled = f0r_plugin_info_t {
        name: PLUGIN_NAME.as_ptr(),
        author: PLUGIN_AUTHOR.as_ptr(),
        plugin_type: F0R_PLUGIN_TYPE_FILTER,
        color_model: F0R_COLOR_MODEL_RGBA8888,
        frei0r_version: FREI0R_MAJOR_VERSION,
        major_version: PLUGIN_MAJOR_VERSION,
        minor_version: PLUGIN_MINOR_VERSION,
        num_params: PARAMS.len() as c_int,
        explanation: PLUGIN_EXPLANATION.as_ptr(),
    };
    // SAFETY: non-null and valid for writes; the target may be uninitialised
    unsafe { info.write(filled) };
    clear_last_error();
}

/// Fill `info` with the description of parameter `index`.
///
/// An out-of-range index leaves `info` untouched and records
/// `InvalidParameter`.
///
/// # Safety
/// `info` must be null or point to writable memory for one `f0r_param_info_t`.
#[no_mangle]
pub unsafe extern "C" fn f0r_get_param_info(info: *mut f0r_param_info_t, index: c_int) {
    let result = if info.is_null() {
        Err(DefaultSecamFireError::null_pointer("info"))
    } else {
        param_index(index)
    };

    if let Ok(slot) = track_result(result) {
        let (name, explanation) = &PARAM_STRINGS[slot];
        let filled = f0r_param_info_t {
            name: name.as_ptr(),
            type_: F0R_PARAM_DOUBLE,
            explanation: explanation.as_ptr(),
        };
        // SAFETY: non-null and valid for writes; the target may be uninitialised
        unsafe { info.write(filled) };
    }
}

/// Set parameter `index` from the `double` behind `param`.
///
/// frei0r hosts send values in `[0, 1]`; they are stored as given.
/// Unknown indices are ignored.
///
/// # Safety
/// `instance` must be null or a live pointer from `f0r_construct`.
/// `param` must be null or point to a readable `double`.
#[no_mangle]
pub unsafe extern "C" fn f0r_set_param_value(
    instance: *mut SecamFireInstance,
    param: *const c_void,
    index: c_int,
) {
    // SAFETY: forwarded caller contract
    let result = unsafe { instance_from_ptr(instance) }.and_then(|instance| {
        // SAFETY: caller guarantees param is null or points to a double
        let value = unsafe { param.cast::<c_double>().as_ref() }
            .copied()
            .ok_or_else(|| DefaultSecamFireError::null_pointer("param"))?;
        let index = param_index(index)?;
        with_effect_mut(instance, |effect| effect.params_mut().set(index, value))?
            .map_err(DefaultSecamFireError::from)
    });
    let _ = track_result(result);
}

/// Write parameter `index` into the `double` behind `param`.
///
/// # Safety
/// `instance` must be null or a live pointer from `f0r_construct`.
/// `param` must be null or point to a writable `double`.
#[no_mangle]
pub unsafe extern "C" fn f0r_get_param_value(
    instance: *mut SecamFireInstance,
    param: *mut c_void,
    index: c_int,
) {
    // SAFETY: forwarded caller contract
    let result = unsafe { instance_from_ptr(instance) }.and_then(|instance| {
        // SAFETY: caller guarantees param is null or points to a double
        let slot = unsafe { param.cast::<c_double>().as_mut() }
            .ok_or_else(|| DefaultSecamFireError::null_pointer("param"))?;
        let slot_index = param_index(index)?;
        let value = with_effect_mut(instance, |effect| effect.params().get(slot_index))?
            .ok_or_else(|| DefaultSecamFireError::invalid_parameter(index))?;
        *slot = value;
        Ok(())
    });
    let _ = track_result(result);
}

/// Process one RGBA8888 frame.
///
/// `inframe` and `outframe` must each hold `width × height` pixels. They may
/// point to the same buffer.
///
/// # Safety
/// `instance` must be null or a live pointer from `f0r_construct`.
/// `inframe` must be null or readable, and `outframe` null or writable, for
/// `width × height` `u32` values.
#[no_mangle]
pub unsafe extern "C" fn f0r_update(
    instance: *mut SecamFireInstance,
    time: c_double,
    inframe: *const u32,
    outframe: *mut u32,
) {
    // SAFETY: forwarded caller contract
    let result = unsafe { instance_from_ptr(instance) }.and_then(|instance| {
        if inframe.is_null() {
            return Err(DefaultSecamFireError::null_pointer("inframe"));
        }
        if outframe.is_null() {
            return Err(DefaultSecamFireError::null_pointer("outframe"));
        }

        with_effect_mut(instance, |effect| {
            let len = effect.width() * effect.height();
            // SAFETY: both pointers are non-null and valid for `len` pixels
            let output = unsafe { std::slice::from_raw_parts_mut(outframe, len) };
            if ptr::eq(inframe, outframe) {
                effect.process_in_place(time, output)
            } else {
                // SAFETY: distinct from outframe, valid for `len` pixels
                let input = unsafe { std::slice::from_raw_parts(inframe, len) };
                effect.process(time, input, output)
            }
        })?
        .map(|_| ())
        .map_err(DefaultSecamFireError::from)
    });
    let _ = track_result(result);
}

/// frei0r 1.2 update entry point. Filters only read `inframe1`.
///
/// # Safety
/// Same contract as `f0r_update` for `instance`, `inframe1` and `outframe`.
#[no_mangle]
pub unsafe extern "C" fn f0r_update2(
    instance: *mut SecamFireInstance,
    time: c_double,
    inframe1: *const u32,
    _inframe2: *const u32,
    _inframe3: *const u32,
    outframe: *mut u32,
) {
    // SAFETY: forwarded caller contract
    unsafe { f0r_update(instance, time, inframe1, outframe) };
}
