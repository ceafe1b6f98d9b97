use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::fmt;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use libloading::{Library, Symbol};
use pupila_app::{
    PxAppEntry, PxAppVTable, PxFrame, PUPILA_APP_ABI_VERSION, PUPILA_APP_ENTRY_SYMBOL,
    PX_ERR_INVALID_FRAME, PX_ERR_PANICKED, PX_OK,
};
use pupila_message::PixelView;
use tracing::{debug, info};

use crate::error::{LoadError, UnitError};
use crate::unit::{FrameOutput, IdentityUnit, ProcessingUnit, IDENTITY_UNIT};

/// Builds a fresh processing unit.
pub type UnitFactory = Box<dyn Fn() -> Box<dyn ProcessingUnit>>;

/// Resolves the configured user module to a processing unit.
///
/// Registered keys are checked first; anything else is treated as a path
/// to a shared library exporting `pupila_app_entry`.
pub struct UnitLoader {
    registry: HashMap<String, UnitFactory>,
}

impl UnitLoader {
    /// A loader with the built-in units registered.
    pub fn new() -> Self {
        Self::empty().with_unit(IDENTITY_UNIT, || Box::new(IdentityUnit))
    }

    /// A loader with nothing registered; every key is a library path.
    pub fn empty() -> Self {
        Self {
            registry: HashMap::new(),
        }
    }

    /// Register a unit under `key`.
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn ProcessingUnit> + 'static,
    {
        self.registry.insert(key.into(), Box::new(factory));
    }

    /// Builder form of [`UnitLoader::register`].
    pub fn with_unit<F>(mut self, key: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ProcessingUnit> + 'static,
    {
        self.register(key, factory);
        self
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.registry.contains_key(key)
    }

    /// Instantiate the unit for `user_module`. Called once per worker run.
    pub fn load(&self, user_module: &str) -> Result<Box<dyn ProcessingUnit>, LoadError> {
        if let Some(factory) = self.registry.get(user_module) {
            let unit = factory();
            info!(key = user_module, unit = unit.name(), "loaded registered unit");
            return Ok(unit);
        }

        let unit = DynamicUnit::open(user_module)?;
        info!(path = user_module, unit = unit.name(), "loaded user module");
        Ok(Box::new(unit))
    }
}

impl Default for UnitLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UnitLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("UnitLoader").field("registry", &keys).finish()
    }
}

/// A processing unit living in a dynamically loaded shared library.
///
/// The instance is created once on open and destroyed on drop, while the
/// library is still mapped.
pub struct DynamicUnit {
    name: String,
    path: PathBuf,
    vtable: PxAppVTable,
    instance: NonNull<c_void>,
    _library: Library,
}

impl DynamicUnit {
    /// Load the library at `path`, check its ABI and construct the unit.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(LoadError::NotFound { path });
        }

        // SAFETY: loading a library runs its initializers; user modules are trusted code.
        let library = unsafe { Library::new(&path) }.map_err(|source| LoadError::Library {
            path: path.clone(),
            source,
        })?;

        // SAFETY: the symbol type matches the ABI contract; the version is checked below.
        let entry: PxAppEntry = unsafe {
            let symbol: Symbol<PxAppEntry> = library
                .get(PUPILA_APP_ENTRY_SYMBOL.as_bytes())
                .map_err(|source| LoadError::MissingEntry {
                    path: path.clone(),
                    symbol: PUPILA_APP_ENTRY_SYMBOL,
                    source,
                })?;
            *symbol
        };

        // SAFETY: entry point trusted by ABI contract; null is checked next.
        let vtable_ptr = unsafe { entry() };
        if vtable_ptr.is_null() {
            return Err(LoadError::NullVTable { path });
        }

        // Only the version field is stable across ABI revisions.
        // SAFETY: non-null pointer to static data inside the loaded library.
        let found = unsafe { (*vtable_ptr).abi_version };
        if found != PUPILA_APP_ABI_VERSION {
            return Err(LoadError::AbiMismatch {
                path,
                expected: PUPILA_APP_ABI_VERSION,
                found,
            });
        }
        // SAFETY: same pointer, layout confirmed by the version check.
        let vtable = unsafe { *vtable_ptr };

        let name = c_string((vtable.name)()).unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        });

        let Some(instance) = NonNull::new((vtable.create)()) else {
            return Err(LoadError::CreateFailed { path });
        };
        debug!(unit = %name, path = ?path, "processing unit created");

        Ok(Self {
            name,
            path,
            vtable,
            instance,
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn last_error(&self) -> String {
        c_string((self.vtable.last_error)())
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| "no error message".to_string())
    }
}

impl ProcessingUnit for DynamicUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn process<'a>(&mut self, mut frame: PixelView<'a>) -> Result<FrameOutput<'a>, UnitError> {
        let (height, width, _) = frame.shape();
        let Some(data) = frame.as_slice_mut() else {
            return Err(UnitError::InvalidFrame {
                unit: self.name.clone(),
                message: "pixel view is not contiguous".to_string(),
            });
        };
        let mut raw = PxFrame {
            data: data.as_mut_ptr(),
            len: data.len(),
            height: height as u32,
            width: width as u32,
        };

        // SAFETY: `instance` came from this vtable's `create`; `raw` borrows the
        // view's buffer for the duration of this call only.
        let status = unsafe { (self.vtable.process)(self.instance.as_ptr(), &mut raw) };
        match status {
            PX_OK => Ok(FrameOutput::View(frame)),
            PX_ERR_INVALID_FRAME => Err(UnitError::InvalidFrame {
                unit: self.name.clone(),
                message: self.last_error(),
            }),
            PX_ERR_PANICKED => Err(UnitError::Panicked {
                unit: self.name.clone(),
                message: self.last_error(),
            }),
            code => Err(UnitError::Failed {
                unit: self.name.clone(),
                message: format!("{} (status {code})", self.last_error()),
            }),
        }
    }
}

impl Drop for DynamicUnit {
    fn drop(&mut self) {
        // SAFETY: created by this vtable, destroyed exactly once, library still loaded.
        unsafe { (self.vtable.destroy)(self.instance.as_ptr()) };
        debug!(unit = %self.name, "processing unit destroyed");
    }
}

impl fmt::Debug for DynamicUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicUnit")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: the unit ABI hands out NUL-terminated strings that stay valid
    // until the next call into the unit.
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}
