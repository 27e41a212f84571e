//! String utilities for dealing with Vulkan's C strings.

use std::ffi::{c_char, CStr, CString};

/// Maps a slice of `CString`s to a `Vec` of raw `const char*` pointers.
/// The original slice must outlive the returned vector.
pub fn unwrap_to_raw_strings(strings: &[CString]) -> Vec<*const c_char> {
    strings.iter().map(|s| s.as_ptr()).collect()
}

/// Copies a raw C string returned from a Vulkan API call into an owned `String`.
/// # Safety
/// `ptr` must point to a valid null-terminated string.
pub unsafe fn wrap_c_str(ptr: *const c_char) -> String {
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}
