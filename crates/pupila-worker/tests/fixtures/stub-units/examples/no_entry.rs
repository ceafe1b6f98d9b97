//! Exports a near-miss of the entry symbol and nothing else.

#[no_mangle]
pub extern "C" fn pupila_app_entry_v0() -> *const u8 {
    std::ptr::null()
}
