//! C-ABI wrapper around `cep-core`.
//!
//! # Overview
//! Exposes CEP validation, formatting, request building and response parsing
//! through `extern "C"` functions so any language with a C FFI can use the
//! lookup logic while performing the HTTP round-trip itself.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary. Bodies that dereference the client are
//!   wrapped in `AssertUnwindSafe`.
//! - `cep_build_lookup` / `cep_parse_lookup` mirror the core API 1:1.
//! - A single `FfiLookupResult` envelope conveys the decoded address or the
//!   error category, message and HTTP status.
//! - The C caller owns all returned pointers and must call the matching
//!   `cep_free_*` function to release them.
//! - Form filling and inline error display stay on the host side; the address
//!   fields are already resolved through the configured schema.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use cep_core::{ClientConfig, HttpResponse};

use types::*;

/// Borrow a C string as `&str`, treating invalid UTF-8 as empty.
///
/// # Safety
/// `ptr` must be non-null and point to a NUL-terminated string that outlives
/// the returned slice.
unsafe fn borrow_str<'a>(ptr: *const c_char) -> &'a str {
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or("")
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new client bound to `base_url`. Pass null to use the default
/// BrasilAPI endpoint.
///
/// Returns null if an internal panic occurs.
/// The caller must free the returned pointer with `cep_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn cep_client_new(base_url: *const c_char) -> *mut FfiCepClient {
    catch_unwind(|| {
        let mut config = ClientConfig::default();
        if !base_url.is_null() {
            config.base_url = unsafe { borrow_str(base_url) }.to_string();
        }
        let client = cep_core::CepClient::with_transport(config, HostTransport);
        Box::into_raw(Box::new(FfiCepClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `cep_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn cep_client_free(client: *mut FfiCepClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// True iff `raw` holds exactly eight digits once punctuation is removed.
/// Null is invalid.
#[unsafe(no_mangle)]
pub extern "C" fn cep_validate(raw: *const c_char) -> bool {
    catch_unwind(|| !raw.is_null() && cep_core::validate(unsafe { borrow_str(raw) }))
        .unwrap_or(false)
}

/// Format `raw` as `DDDDD-DDD`, or return its bare digits if it is not a full
/// CEP. Returns null if `raw` is null.
/// The caller must free the returned string with `cep_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn cep_format(raw: *const c_char) -> *mut c_char {
    catch_unwind(|| {
        if raw.is_null() {
            return std::ptr::null_mut();
        }
        to_c_string(cep_core::format(unsafe { borrow_str(raw) }))
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Build / parse
// ---------------------------------------------------------------------------

/// Build the GET request for `raw`.
///
/// Returns null if `client` or `raw` is null, or if `raw` is not a valid CEP.
/// The caller must free the returned pointer with `cep_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn cep_build_lookup(
    client: *const FfiCepClient,
    raw: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() || raw.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match client.inner.build_lookup(unsafe { borrow_str(raw) }) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body is
/// treated as empty; invalid UTF-8 is replaced with U+FFFD so the decoder
/// sees the rest of the body.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = if resp.body.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(resp.body) }
            .to_string_lossy()
            .into_owned()
    };
    HttpResponse {
        status: resp.status,
        headers: Vec::new(),
        body,
    }
}

/// Parse the HTTP response of a lookup request.
///
/// Never returns null. The caller must free the result with
/// `cep_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn cep_parse_lookup(
    client: *const FfiCepClient,
    response: *const FfiHttpResponse,
) -> *mut FfiLookupResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiLookupResult::null_arg("client");
        }
        if response.is_null() {
            return FfiLookupResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        match client.inner.parse_lookup(ffi_response_to_core(resp)) {
            Ok(record) => FfiLookupResult::ok_address(&record, &client.inner.config().schema),
            Err(e) => FfiLookupResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiLookupResult::panic("panic in cep_parse_lookup"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `cep_build_lookup`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn cep_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        if !req.url.is_null() {
            drop(unsafe { CString::from_raw(req.url) });
        }
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                if !h.key.is_null() {
                    drop(unsafe { CString::from_raw(h.key) });
                }
                if !h.value.is_null() {
                    drop(unsafe { CString::from_raw(h.value) });
                }
            }
        }
    });
}

/// Free an `FfiLookupResult` returned by `cep_parse_lookup`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn cep_free_result(result: *mut FfiLookupResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.address.is_null() {
            let address = unsafe { Box::from_raw(result.address) };
            address.free_fields();
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn cep_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
