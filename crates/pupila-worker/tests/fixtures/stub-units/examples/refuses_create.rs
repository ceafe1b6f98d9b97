use pupila_stub_units::{stub_vtable, StubVTable};

static VTABLE: StubVTable = stub_vtable(1);

#[no_mangle]
pub extern "C" fn pupila_app_entry() -> *const StubVTable {
    &VTABLE
}
