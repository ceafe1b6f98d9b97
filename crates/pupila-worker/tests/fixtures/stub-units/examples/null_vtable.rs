use pupila_stub_units::StubVTable;

#[no_mangle]
pub extern "C" fn pupila_app_entry() -> *const StubVTable {
    std::ptr::null()
}
