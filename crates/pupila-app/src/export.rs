//! ABI shims instantiated by [`export_app!`](crate::export_app).
//!
//! Not meant to be called directly; they are public only so the macro can
//! reach them from the user's crate.

use std::ffi::c_void;
use std::os::raw::c_char;
use std::panic::AssertUnwindSafe;

use pupila_message::PixelView;

use crate::error;
use crate::types::{PxFrame, PX_ERR_FAILED, PX_ERR_INVALID_FRAME, PX_ERR_PANICKED, PX_OK};
use crate::App;

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

fn invalid_frame(message: impl Into<String>) -> i32 {
    error::set_error_message(message);
    PX_ERR_INVALID_FRAME
}

pub extern "C" fn create<A: App>() -> *mut c_void {
    ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();
        Box::into_raw(Box::new(A::default())).cast::<c_void>()
    })
}

/// # Safety
/// `app` must come from `create::<A>` and not yet be destroyed. `frame`
/// must point to a `PxFrame` whose `data` is valid for `len` bytes of
/// reads and writes for the duration of the call.
pub unsafe extern "C" fn process<A: App>(app: *mut c_void, frame: *mut PxFrame) -> i32 {
    ffi_boundary(PX_ERR_PANICKED, || {
        error::clear_error_state();
        if app.is_null() || frame.is_null() {
            return invalid_frame("null app or frame pointer");
        }
        // SAFETY: caller guarantees both pointers are live and exclusive for this call.
        let (app, frame) = unsafe { (&mut *app.cast::<A>(), &*frame) };
        if frame.data.is_null() {
            return invalid_frame("null pixel buffer");
        }
        // SAFETY: `data` is valid for `len` bytes per the caller contract.
        let data = unsafe { std::slice::from_raw_parts_mut(frame.data, frame.len) };
        let mut view = match PixelView::new(data, frame.height, frame.width) {
            Ok(view) => view,
            Err(err) => return invalid_frame(err.to_string()),
        };

        match app.process(&mut view) {
            Ok(()) => PX_OK,
            Err(message) => {
                error::set_error_message(message);
                PX_ERR_FAILED
            }
        }
    })
}

/// # Safety
/// `app` must come from `create::<A>` and must not be used afterwards.
pub unsafe extern "C" fn destroy<A: App>(app: *mut c_void) {
    ffi_boundary((), || {
        if !app.is_null() {
            // SAFETY: the pointer was produced by `Box::into_raw` in `create::<A>`.
            drop(unsafe { Box::from_raw(app.cast::<A>()) });
        }
    })
}

pub extern "C" fn last_error() -> *const c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
