//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion functions live here
//! to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use cep_core::{AddressField, AddressRecord, HttpMethod, LookupError, ResponseSchema};

/// Opaque handle to a `CepClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
///
/// Only `build_lookup`, `parse_lookup` and `config` are called on `inner`.
/// `lookup` and `lookup_and_apply` would go through `HostTransport` and always
/// fail with a transport error, so no exported function may reach them.
pub struct FfiCepClient {
    pub(crate) inner: cep_core::CepClient<HostTransport>,
}

/// Placeholder transport: through the C ABI the host performs all I/O, so the
/// wrapped client only ever builds requests and parses responses. Executing a
/// request through it is an error.
pub struct HostTransport;

impl cep_core::Transport for HostTransport {
    fn execute(
        &self,
        request: &cep_core::HttpRequest,
    ) -> Result<cep_core::HttpResponse, cep_core::TransportError> {
        Err(cep_core::TransportError::new(format!(
            "{} {} must be executed by the host",
            request.method.as_str(),
            request.url
        )))
    }
}

/// Convert a Rust string into an owned C string. Interior NULs cannot cross
/// the boundary, so they are dropped.
pub(crate) fn to_c_string(s: impl Into<String>) -> *mut c_char {
    let mut bytes: Vec<u8> = s.into().into_bytes();
    bytes.retain(|&b| b != 0);
    CString::new(bytes).unwrap_or_default().into_raw()
}

fn opt_c_string(s: Option<String>) -> *mut c_char {
    s.map(to_c_string).unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `cep_build_lookup`. The C caller executes the request and passes
/// the response back through `cep_parse_lookup`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: cep_core::HttpRequest) -> *mut Self {
        let url = to_c_string(req.url);

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: to_c_string(k),
                    value: to_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing an HTTP request,
/// then passes a pointer to `cep_parse_lookup`. The FFI layer reads but does
/// not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiLookupResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Validation = 1,
    NotFound = 2,
    Service = 3,
    Transport = 4,
    Deserialization = 5,
    Panic = 6,
    NullArg = 7,
}

/// A decoded address exposed to C. Fields absent from the response are null;
/// `raw_json` always holds the full body as received.
#[repr(C)]
pub struct FfiAddress {
    pub cep: *mut c_char,
    pub street: *mut c_char,
    pub neighborhood: *mut c_char,
    pub city: *mut c_char,
    pub state: *mut c_char,
    pub raw_json: *mut c_char,
}

impl FfiAddress {
    fn from_record(record: &AddressRecord, schema: &ResponseSchema) -> Self {
        let field = |f: AddressField| opt_c_string(record.field(f, schema));
        FfiAddress {
            cep: field(AddressField::Cep),
            street: field(AddressField::Rua),
            neighborhood: field(AddressField::Bairro),
            city: field(AddressField::Cidade),
            state: field(AddressField::Estado),
            raw_json: to_c_string(serde_json::to_string(record).unwrap_or_default()),
        }
    }

    /// Free the C-string fields (but not the struct itself).
    pub(crate) fn free_fields(&self) {
        for ptr in [
            self.cep,
            self.street,
            self.neighborhood,
            self.city,
            self.state,
            self.raw_json,
        ] {
            if !ptr.is_null() {
                drop(unsafe { CString::from_raw(ptr) });
            }
        }
    }
}

/// Result envelope for `cep_parse_lookup`.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `address`
/// points to the decoded address. On failure `error_code` describes the
/// category, `error_message` is a human-readable C string, and `address` is
/// null.
#[repr(C)]
pub struct FfiLookupResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub address: *mut FfiAddress,
}

impl FfiLookupResult {
    /// Build a success result carrying an `FfiAddress`.
    pub(crate) fn ok_address(record: &AddressRecord, schema: &ResponseSchema) -> *mut Self {
        let address = Box::new(FfiAddress::from_record(record, schema));
        Box::into_raw(Box::new(FfiLookupResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            address: Box::into_raw(address),
        }))
    }

    /// Build an error result from a `LookupError`.
    pub(crate) fn from_error(err: LookupError) -> *mut Self {
        let error_code = match &err {
            LookupError::Validation { .. } => FfiErrorCode::Validation,
            LookupError::NotFound => FfiErrorCode::NotFound,
            LookupError::Service { .. } => FfiErrorCode::Service,
            LookupError::Transport(_) => FfiErrorCode::Transport,
            LookupError::Deserialization(_) => FfiErrorCode::Deserialization,
        };
        Self::failure(error_code, err.status().unwrap_or(0), err.to_string())
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, 0, format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, 0, msg.to_string())
    }

    fn failure(error_code: FfiErrorCode, http_status: u16, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiLookupResult {
            error_code,
            error_message: to_c_string(msg),
            http_status,
            address: std::ptr::null_mut(),
        }))
    }
}
