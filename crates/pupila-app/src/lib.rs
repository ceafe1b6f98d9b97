//! Contract between the pupila worker and user-written processing units.
//!
//! A processing unit is a `cdylib` exporting one C-ABI entry symbol,
//! [`PUPILA_APP_ENTRY_SYMBOL`], that returns a [`PxAppVTable`]. Unit
//! authors do not write that by hand: implement [`App`] on a type with a
//! zero-argument constructor and invoke [`export_app!`].
//!
//! ```ignore
//! use pupila_app::{export_app, App, PixelView};
//!
//! #[derive(Default)]
//! struct Grayscale;
//!
//! impl App for Grayscale {
//!     fn process(&mut self, frame: &mut PixelView<'_>) -> Result<(), String> {
//!         for mut pixel in frame.as_array_mut().rows_mut() {
//!             let luma = (pixel.iter().map(|&c| c as u16).sum::<u16>() / 3) as u8;
//!             pixel.fill(luma);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! export_app!(Grayscale);
//! ```

mod error;
#[doc(hidden)]
pub mod export;
mod types;

pub use pupila_message::{PixelBuffer, PixelView};
pub use types::{
    PxAppEntry, PxAppVTable, PxFrame, PUPILA_APP_ABI_VERSION, PUPILA_APP_ENTRY_SYMBOL,
    PX_ERR_FAILED, PX_ERR_INVALID_FRAME, PX_ERR_PANICKED, PX_OK,
};

/// A user-defined processing unit.
///
/// One instance is built with `Default::default()` when the worker starts
/// and then sees every frame of the stream, one at a time, on one thread.
pub trait App: Default + 'static {
    /// Edit `frame` in place. An `Err` is a fault for the whole worker run.
    fn process(&mut self, frame: &mut PixelView<'_>) -> Result<(), String>;
}

/// Export `$app` as this library's processing unit.
#[macro_export]
macro_rules! export_app {
    ($app:ty) => {
        #[no_mangle]
        pub extern "C" fn pupila_app_entry() -> *const $crate::PxAppVTable {
            extern "C" fn app_name() -> *const ::std::os::raw::c_char {
                concat!(stringify!($app), "\0").as_ptr().cast()
            }

            static VTABLE: $crate::PxAppVTable = $crate::PxAppVTable {
                abi_version: $crate::PUPILA_APP_ABI_VERSION,
                name: app_name,
                create: $crate::export::create::<$app>,
                process: $crate::export::process::<$app>,
                destroy: $crate::export::destroy::<$app>,
                last_error: $crate::export::last_error,
            };
            &VTABLE
        }
    };
}
