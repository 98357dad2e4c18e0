//! FFI bindings for Workout Match
//!
//! This module provides C-compatible functions for calling the engine from other
//! languages. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `wm_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::adapters::adapter_for;
use crate::pipeline::{flatten_plan_json, match_workout_json, WorkoutMatcher};
use crate::scorer::ScoringConfig;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Read a required string argument, recording an error when it is invalid
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Option<String> {
    let value = cstr_to_string(ptr);
    if value.is_none() {
        set_last_error(&format!("Invalid {} string pointer", name));
    }
    value
}

// ============================================================================
// Stateless API
// ============================================================================

/// Flatten plan JSON and return flat-step JSON.
///
/// # Safety
/// - `plan_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `wm_free_string`.
/// - Returns NULL on error; call `wm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wm_flatten_plan(plan_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(plan) = required_arg(plan_json, "plan JSON") else {
        return ptr::null_mut();
    };

    match flatten_plan_json(plan) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Match native activity JSON against plan JSON and return the report JSON.
///
/// # Safety
/// - `plan_json` and `activity_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `wm_free_string`.
/// - Returns NULL on error; call `wm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wm_match_workout(
    plan_json: *const c_char,
    activity_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(plan) = required_arg(plan_json, "plan JSON") else {
        return ptr::null_mut();
    };
    let Some(activity) = required_arg(activity_json, "activity JSON") else {
        return ptr::null_mut();
    };

    match match_workout_json(plan, activity) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Configured Matcher API
// ============================================================================

/// Opaque handle to a WorkoutMatcher
pub struct WorkoutMatcherHandle {
    matcher: WorkoutMatcher,
}

/// Create a matcher from scoring configuration JSON (NULL for defaults).
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `wm_matcher_free`.
/// - Returns NULL on error; call `wm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wm_matcher_new(config_json: *const c_char) -> *mut WorkoutMatcherHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        ScoringConfig::default()
    } else {
        let Some(json) = required_arg(config_json, "config JSON") else {
            return ptr::null_mut();
        };
        match ScoringConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match WorkoutMatcher::with_config(config) {
        Ok(matcher) => Box::into_raw(Box::new(WorkoutMatcherHandle { matcher })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a matcher.
///
/// # Safety
/// - `matcher` must be a valid pointer returned by `wm_matcher_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn wm_matcher_free(matcher: *mut WorkoutMatcherHandle) {
    if !matcher.is_null() {
        drop(Box::from_raw(matcher));
    }
}

/// Match activity JSON from the named source ("native" or "strava") against plan JSON.
///
/// # Safety
/// - `matcher` must be a valid pointer returned by `wm_matcher_new`.
/// - `source`, `plan_json` and `activity_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `wm_free_string`.
/// - Returns NULL on error; call `wm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wm_matcher_match(
    matcher: *const WorkoutMatcherHandle,
    source: *const c_char,
    plan_json: *const c_char,
    activity_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if matcher.is_null() {
        set_last_error("Null matcher pointer");
        return ptr::null_mut();
    }
    let handle = &*matcher;

    let Some(source) = required_arg(source, "source") else {
        return ptr::null_mut();
    };
    let Some(plan) = required_arg(plan_json, "plan JSON") else {
        return ptr::null_mut();
    };
    let Some(activity) = required_arg(activity_json, "activity JSON") else {
        return ptr::null_mut();
    };

    let result = adapter_for(&source)
        .and_then(|adapter| handle.matcher.match_json(adapter.as_ref(), &plan, &activity));

    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Workout Match functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Workout Match function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn wm_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Workout Match call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn wm_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn wm_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
