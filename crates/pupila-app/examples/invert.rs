//! Photographic negative: every channel `v` becomes `255 - v`.
//!
//! Build with `cargo build -p pupila-app --example invert` and point the
//! worker at the resulting shared library.

use pupila_app::{export_app, App, PixelView};

#[derive(Default)]
struct Invert;

impl App for Invert {
    fn process(&mut self, frame: &mut PixelView<'_>) -> Result<(), String> {
        frame.as_array_mut().mapv_inplace(|v| 255 - v);
        Ok(())
    }
}

export_app!(Invert);
