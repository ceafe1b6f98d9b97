use std::ffi::c_void;
use std::os::raw::c_char;

/// Bumped whenever [`PxAppVTable`] or [`PxFrame`] change layout.
pub const PUPILA_APP_ABI_VERSION: u32 = 1;

/// Symbol every processing unit library must export.
pub const PUPILA_APP_ENTRY_SYMBOL: &str = "pupila_app_entry";

pub const PX_OK: i32 = 0;
/// The unit reported an error; see `last_error`.
pub const PX_ERR_FAILED: i32 = 1;
/// The host passed a null or inconsistent frame.
pub const PX_ERR_INVALID_FRAME: i32 = 2;
/// The unit panicked; the panic was stopped at the ABI boundary.
pub const PX_ERR_PANICKED: i32 = 3;

/// One RGB frame lent to the unit for the duration of a `process` call.
#[repr(C)]
#[derive(Debug)]
pub struct PxFrame {
    pub data: *mut u8,
    pub len: usize,
    pub height: u32,
    pub width: u32,
}

/// Function table returned by the entry symbol.
///
/// `create` runs once per worker; the pointer it returns is passed back to
/// `process` for every frame and to `destroy` exactly once.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PxAppVTable {
    pub abi_version: u32,
    pub name: extern "C" fn() -> *const c_char,
    pub create: extern "C" fn() -> *mut c_void,
    pub process: unsafe extern "C" fn(app: *mut c_void, frame: *mut PxFrame) -> i32,
    pub destroy: unsafe extern "C" fn(app: *mut c_void),
    pub last_error: extern "C" fn() -> *const c_char,
}

pub type PxAppEntry = unsafe extern "C" fn() -> *const PxAppVTable;
