//! Claims an ABI revision the host has never heard of.

use pupila_stub_units::{stub_vtable, StubVTable};

static VTABLE: StubVTable = stub_vtable(99);

#[no_mangle]
pub extern "C" fn pupila_app_entry() -> *const StubVTable {
    &VTABLE
}
