//! C ABI for the requester side, so a parent written in another language can
//! drive a worker through the mailbox.

use std::ffi::{c_char, CStr};
use std::ptr;
use std::time::Duration;

use crate::error::MailboxError;
use crate::Mailbox::{Requester, RequesterBuilder};

// Error codes
const MBX_SUCCESS: i32 = 0;
const MBX_ERROR_NULL_POINTER: i32 = -1;
const MBX_ERROR_INVALID_ARG: i32 = -2;
const MBX_ERROR_PAYLOAD_TOO_LARGE: i32 = -3;
const MBX_ERROR_TIMEOUT: i32 = -4;
const MBX_ERROR_INTERNAL: i32 = -5;

/// Handle to a requester instance (opaque pointer)
pub struct RequesterHandle {
    inner: Requester,
}

/// Attach to a worker's mailbox.
///
/// # Arguments
/// * `name` - NUL-terminated segment name, or NULL for the default name.
/// * `timeout_ms` - Per-call timeout; 0 keeps the default.
///
/// # Returns
/// * Pointer to `RequesterHandle`, or NULL on failure.
#[no_mangle]
pub extern "C" fn mbx_requester_attach(
    name: *const c_char,
    timeout_ms: u32,
) -> *mut RequesterHandle {
    let mut builder = RequesterBuilder::new();

    if !name.is_null() {
        let name = unsafe { CStr::from_ptr(name) };
        match name.to_str() {
            Ok(name) => builder = builder.with_name(name),
            Err(_) => {
                eprintln!("FFI Error: mailbox name is not valid UTF-8");
                return ptr::null_mut();
            }
        }
    }
    if timeout_ms > 0 {
        builder = builder.with_timeout(Duration::from_millis(timeout_ms as u64));
    }

    match builder.build() {
        Ok(requester) => Box::into_raw(Box::new(RequesterHandle { inner: requester })),
        Err(e) => {
            eprintln!("FFI Error: Failed to attach requester: {}", e);
            ptr::null_mut()
        }
    }
}

/// Send one request and copy the response out.
///
/// # Arguments
/// * `handle` - Pointer to `RequesterHandle`.
/// * `data` - Pointer to the request bytes (may be NULL if `len` is 0).
/// * `len` - Length of the request.
/// * `out_buf` - Buffer to write the response into.
/// * `out_len` - Input: size of `out_buf`, Output: size of the response.
///
/// # Returns
/// * 0 on success.
/// * MBX_ERROR_INVALID_ARG if `out_buf` is too small (`*out_len` holds the needed size).
/// * MBX_ERROR_PAYLOAD_TOO_LARGE if the request exceeds the mailbox capacity.
/// * MBX_ERROR_TIMEOUT if the worker did not answer in time.
#[no_mangle]
pub extern "C" fn mbx_requester_call(
    handle: *mut RequesterHandle,
    data: *const u8,
    len: usize,
    out_buf: *mut u8,
    out_len: *mut usize,
) -> i32 {
    if handle.is_null() || out_len.is_null() || (data.is_null() && len > 0) {
        return MBX_ERROR_NULL_POINTER;
    }

    let requester = unsafe { &(*handle).inner };
    let request: &[u8] = if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(data, len) }
    };
    let max_len = unsafe { *out_len };

    let response = match requester.call_bytes(request) {
        Ok(response) => response,
        Err(MailboxError::PayloadTooLarge { .. }) => return MBX_ERROR_PAYLOAD_TOO_LARGE,
        Err(MailboxError::Timeout(_)) => return MBX_ERROR_TIMEOUT,
        Err(e) => {
            eprintln!("FFI Error: call failed: {}", e);
            return MBX_ERROR_INTERNAL;
        }
    };

    unsafe { *out_len = response.len() };
    if response.len() > max_len {
        return MBX_ERROR_INVALID_ARG; // Buffer too small
    }
    if !response.is_empty() {
        if out_buf.is_null() {
            return MBX_ERROR_NULL_POINTER;
        }
        unsafe { ptr::copy_nonoverlapping(response.as_ptr(), out_buf, response.len()) };
    }
    MBX_SUCCESS
}

/// Free a requester handle.
#[no_mangle]
pub extern "C" fn mbx_requester_free(handle: *mut RequesterHandle) {
    if !handle.is_null() {
        unsafe {
            let _ = Box::from_raw(handle); // Dropped automatically
        }
    }
}
