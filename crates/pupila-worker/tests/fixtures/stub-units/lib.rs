//! Vtable mirror shared by the stub unit libraries.

use std::ffi::c_void;
use std::os::raw::c_char;

/// Same layout as the host's unit vtable.
#[repr(C)]
pub struct StubVTable {
    pub abi_version: u32,
    pub name: extern "C" fn() -> *const c_char,
    pub create: extern "C" fn() -> *mut c_void,
    pub process: unsafe extern "C" fn(app: *mut c_void, frame: *mut c_void) -> i32,
    pub destroy: unsafe extern "C" fn(app: *mut c_void),
    pub last_error: extern "C" fn() -> *const c_char,
}

extern "C" fn name() -> *const c_char {
    c"stub".as_ptr()
}

extern "C" fn no_instance() -> *mut c_void {
    std::ptr::null_mut()
}

unsafe extern "C" fn process(_app: *mut c_void, _frame: *mut c_void) -> i32 {
    1
}

unsafe extern "C" fn destroy(_app: *mut c_void) {}

extern "C" fn last_error() -> *const c_char {
    std::ptr::null()
}

/// A vtable whose `create` never yields an instance.
pub const fn stub_vtable(abi_version: u32) -> StubVTable {
    StubVTable {
        abi_version,
        name,
        create: no_instance,
        process,
        destroy,
        last_error,
    }
}
