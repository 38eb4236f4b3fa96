//! Native HDF5 filter plugins.
//!
//! A native plugin is a shared library exporting the HDF5 dynamic plugin entry points:
//!  - `H5PLget_plugin_type`, which must return [`H5PL_TYPE_FILTER`], and
//!  - `H5PLget_plugin_info`, which returns an [`H5ZClass2`] filter class.
//!
//! A plugin may also export `NCZ_codec_info_defaults`, returning a null terminated array of [`NczCodec`] pointers.
//! Each names the codec of an HDF5 filter that may have no codec in the catalog.
//! These codecs take the raw filter parameter vector as their configuration.
//!
//! Filter functions follow the HDF5 convention: the input is passed in a `malloc` allocated buffer which the filter may replace, and a return value of zero indicates failure.
//! A native filter can therefore never produce an empty output.

use std::{
    ffi::{c_char, c_int, c_uint, c_void, CStr},
    path::Path,
};

use libloading::{Library, Symbol};

use crate::{
    codec_catalog::CodecEntry,
    filter::{FilterDirection, FilterId},
};

use super::{
    FilterPluginTraits, Plugin, PluginError, PluginLoadError, PluginLoaderTraits, PluginSource,
};

/// The plugin type of filter plugins.
pub const H5PL_TYPE_FILTER: c_int = 0;
/// The supported [`H5ZClass2`] version.
pub const H5Z_CLASS_T_VERS: c_int = 1;
/// The flag passed to a filter function to decode.
pub const H5Z_FLAG_REVERSE: c_uint = 0x0100;
/// The supported [`NczCodec`] version.
pub const NCZ_CODEC_CLASS_VER: c_int = 1;
/// The [`NczCodec`] sort of codecs describing an HDF5 filter.
pub const NCZ_CODEC_HDF5: c_int = 1;

const SYMBOL_PLUGIN_TYPE: &str = "H5PLget_plugin_type";
const SYMBOL_PLUGIN_INFO: &str = "H5PLget_plugin_info";
const SYMBOL_CODEC_DEFAULTS: &str = "NCZ_codec_info_defaults";

/// An HDF5 filter function.
pub type H5ZFunc = unsafe extern "C" fn(
    flags: c_uint,
    cd_nelmts: usize,
    cd_values: *const c_uint,
    nbytes: usize,
    buf_size: *mut usize,
    buf: *mut *mut c_void,
) -> usize;

type GetPluginTypeFn = unsafe extern "C" fn() -> c_int;
type GetPluginInfoFn = unsafe extern "C" fn() -> *const c_void;
type CodecInfoDefaultsFn = unsafe extern "C" fn() -> *const *const NczCodec;
type CodecLifecycleFn = unsafe extern "C" fn();

/// The HDF5 `H5Z_class2_t` filter class.
#[repr(C)]
#[derive(Debug)]
pub struct H5ZClass2 {
    /// The class version, [`H5Z_CLASS_T_VERS`].
    pub version: c_int,
    /// The filter identifier.
    pub id: c_int,
    /// Non-zero if the encoder is present.
    pub encoder_present: c_uint,
    /// Non-zero if the decoder is present.
    pub decoder_present: c_uint,
    /// The filter name.
    pub name: *const c_char,
    /// The `can_apply` callback, unused.
    pub can_apply: *const c_void,
    /// The `set_local` callback, unused.
    pub set_local: *const c_void,
    /// The filter function.
    pub filter: Option<H5ZFunc>,
}

/// The NCZarr `NCZ_codec_t` codec class returned by `NCZ_codec_info_defaults`.
#[repr(C)]
#[derive(Debug)]
pub struct NczCodec {
    /// The class version, [`NCZ_CODEC_CLASS_VER`].
    pub version: c_int,
    /// The layout of the remainder of the class, [`NCZ_CODEC_HDF5`].
    pub sort: c_int,
    /// The codec name.
    pub codecid: *const c_char,
    /// The HDF5 filter identifier.
    pub hdf5id: c_uint,
    /// Called once when the plugin is loaded.
    pub codec_initialize: Option<CodecLifecycleFn>,
    /// Called once when the plugin is unloaded.
    pub codec_finalize: Option<CodecLifecycleFn>,
    /// `NCZ_codec_to_hdf5`, unused.
    pub codec_to_hdf5: *const c_void,
    /// `NCZ_hdf5_to_codec`, unused.
    pub hdf5_to_codec: *const c_void,
    /// `NCZ_modify_parameters`, unused.
    pub modify_parameters: *const c_void,
}

/// A codec read from an [`NczCodec`].
#[derive(Debug)]
pub(crate) struct NativeCodec {
    entry: CodecEntry,
    initialize: Option<CodecLifecycleFn>,
    finalize: Option<CodecLifecycleFn>,
}

/// Loads HDF5 filter plugins from shared libraries.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePluginLoader;

impl NativePluginLoader {
    /// Create a new native plugin loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PluginLoaderTraits for NativePluginLoader {
    fn load(&self, path: &Path) -> Result<Plugin, PluginLoadError> {
        let invalid = |reason: &str| PluginLoadError::InvalidDescriptor {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        // SAFETY: Loading a library runs its initialisers. Libraries on the plugin search path are trusted.
        let library = unsafe { Library::new(path) }.map_err(|source| PluginLoadError::Library {
            path: path.to_path_buf(),
            source,
        })?;

        // SAFETY: The symbol has the HDF5 `H5PLget_plugin_type` signature.
        let plugin_type = unsafe {
            let get_plugin_type: Symbol<GetPluginTypeFn> =
                get_symbol(&library, path, SYMBOL_PLUGIN_TYPE)?;
            get_plugin_type()
        };
        if plugin_type != H5PL_TYPE_FILTER {
            return Err(PluginLoadError::NotAFilter {
                path: path.to_path_buf(),
                plugin_type,
            });
        }

        // SAFETY: The symbol has the HDF5 `H5PLget_plugin_info` signature, and returns a pointer to a static `H5Z_class2_t` for filter plugins.
        let class = unsafe {
            let get_plugin_info: Symbol<GetPluginInfoFn> =
                get_symbol(&library, path, SYMBOL_PLUGIN_INFO)?;
            get_plugin_info()
                .cast::<H5ZClass2>()
                .as_ref()
                .ok_or_else(|| invalid("the filter class is null"))?
        };
        if class.version != H5Z_CLASS_T_VERS {
            return Err(invalid(&format!(
                "unsupported filter class version {}",
                class.version
            )));
        }
        let id = FilterId::try_from(class.id)
            .map_err(|_| invalid(&format!("invalid filter identifier {}", class.id)))?;
        let filter = class
            .filter
            .ok_or_else(|| invalid("the filter function is null"))?;
        let name = if class.name.is_null() {
            format!("filter {id}")
        } else {
            // SAFETY: A non-null class name is a nul terminated string in the library's static data.
            unsafe { CStr::from_ptr(class.name) }
                .to_string_lossy()
                .into_owned()
        };
        let function = NativeFilterFunction {
            name: name.clone(),
            filter,
            encoder_present: class.encoder_present != 0,
            decoder_present: class.decoder_present != 0,
        };

        // SAFETY: The symbol has the `NCZ_codec_info_defaults` signature.
        let codecs = match unsafe {
            library.get::<CodecInfoDefaultsFn>(SYMBOL_CODEC_DEFAULTS.as_bytes())
        } {
            // SAFETY: The function returns null or a null terminated array of codec classes in the library's static data.
            Ok(codec_info_defaults) => unsafe { read_codec_defaults(path, codec_info_defaults()) },
            Err(_) => Vec::new(),
        };

        let mut codec_defaults = Vec::with_capacity(codecs.len());
        let mut codec_finalizers = Vec::new();
        for codec in codecs {
            if let Some(initialize) = codec.initialize {
                // SAFETY: The codec initializer takes no arguments and is called once per load.
                unsafe { initialize() };
            }
            codec_finalizers.extend(codec.finalize);
            codec_defaults.push(codec.entry);
        }

        let implementation = NativeFilter {
            function,
            codec_finalizers,
            _library: library,
        };
        Ok(Plugin::new(id, name, Box::new(implementation))
            .with_codec_defaults(codec_defaults)
            .with_source(PluginSource::Native(path.to_path_buf())))
    }
}

/// Get symbol `name` from `library`.
///
/// # Safety
/// `T` must match the type of the symbol.
unsafe fn get_symbol<'lib, T>(
    library: &'lib Library,
    path: &Path,
    name: &'static str,
) -> Result<Symbol<'lib, T>, PluginLoadError> {
    library
        .get::<T>(name.as_bytes())
        .map_err(|_| PluginLoadError::MissingEntryPoint {
            path: path.to_path_buf(),
            symbol: name,
        })
}

/// Read a null terminated array of codec classes.
///
/// Invalid codec classes are logged and skipped.
///
/// # Safety
/// `codecs` must be null or point to a null terminated array of [`NczCodec`] pointers, each valid for reads.
pub(crate) unsafe fn read_codec_defaults(
    path: &Path,
    codecs: *const *const NczCodec,
) -> Vec<NativeCodec> {
    let mut native_codecs = Vec::new();
    if codecs.is_null() {
        return native_codecs;
    }
    let mut cursor = codecs;
    while let Some(codec) = (*cursor).as_ref() {
        match native_codec(codec) {
            Ok(native_codec) => native_codecs.push(native_codec),
            Err(reason) => tracing::warn!(
                "ignoring codec default of plugin {}: {reason}",
                path.display()
            ),
        }
        cursor = cursor.add(1);
    }
    native_codecs
}

/// # Safety
/// A non-null `codec.codecid` must be a nul terminated string.
unsafe fn native_codec(codec: &NczCodec) -> Result<NativeCodec, String> {
    if codec.version != NCZ_CODEC_CLASS_VER {
        return Err(format!(
            "unsupported codec class version {}",
            codec.version
        ));
    }
    if codec.sort != NCZ_CODEC_HDF5 {
        return Err(format!("unsupported codec class sort {}", codec.sort));
    }
    if codec.codecid.is_null() {
        return Err(format!("codec for filter {} has no name", codec.hdf5id));
    }
    let name = CStr::from_ptr(codec.codecid).to_string_lossy();
    Ok(NativeCodec {
        entry: CodecEntry::new_raw(codec.hdf5id, name),
        initialize: codec.codec_initialize,
        finalize: codec.codec_finalize,
    })
}

/// A native filter function and its class flags.
#[derive(Debug)]
struct NativeFilterFunction {
    name: String,
    filter: H5ZFunc,
    encoder_present: bool,
    decoder_present: bool,
}

impl NativeFilterFunction {
    fn supports(&self, direction: FilterDirection) -> bool {
        match direction {
            FilterDirection::Encode => self.encoder_present,
            FilterDirection::Decode => self.decoder_present,
        }
    }

    /// Run the filter function over a `malloc` copy of `bytes`.
    fn invoke(
        &self,
        flags: c_uint,
        bytes: Vec<u8>,
        parameters: &[u32],
    ) -> Result<Vec<u8>, PluginError> {
        let nbytes = bytes.len();
        let mut buf_size = nbytes.max(1);
        // SAFETY: `buf_size` is non-zero.
        let mut buf = unsafe { libc::malloc(buf_size) };
        if buf.is_null() {
            return Err(PluginError::AllocationFailure(buf_size));
        }
        // SAFETY: `buf` is a fresh allocation of at least `nbytes` bytes.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), nbytes) };
        drop(bytes);

        // SAFETY: The filter owns `buf` for the duration of the call and may replace it with another `malloc` allocation of `buf_size` bytes.
        // `cd_values` points to `parameters.len()` values.
        let valid = unsafe {
            (self.filter)(
                flags,
                parameters.len(),
                parameters.as_ptr(),
                nbytes,
                &mut buf_size,
                &mut buf,
            )
        };
        let result = if valid == 0 {
            Err(PluginError::NativeFailure(self.name.clone()))
        } else if buf.is_null() || valid > buf_size {
            Err(PluginError::Other(format!(
                "native filter {} returned {valid} bytes in a {buf_size} byte buffer",
                self.name
            )))
        } else {
            // SAFETY: The first `valid` bytes of `buf` were written by the filter.
            Ok(unsafe { std::slice::from_raw_parts(buf.cast::<u8>(), valid) }.to_vec())
        };
        // SAFETY: `buf` is a `malloc` allocation owned by the caller after the filter returns.
        unsafe { libc::free(buf) };
        result
    }
}

/// A filter implemented by a native plugin.
///
/// The library stays loaded while the filter exists.
/// Codec finalizers run before it is unloaded.
#[derive(Debug)]
struct NativeFilter {
    function: NativeFilterFunction,
    codec_finalizers: Vec<CodecLifecycleFn>,
    _library: Library,
}

impl Drop for NativeFilter {
    fn drop(&mut self) {
        for finalize in &self.codec_finalizers {
            // SAFETY: The library is still loaded, and the finalizer matches an initializer run at load.
            unsafe { finalize() };
        }
    }
}

impl FilterPluginTraits for NativeFilter {
    fn encode(&self, decoded_value: Vec<u8>, parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        self.function.invoke(0, decoded_value, parameters)
    }

    fn decode(&self, encoded_value: Vec<u8>, parameters: &[u32]) -> Result<Vec<u8>, PluginError> {
        self.function
            .invoke(H5Z_FLAG_REVERSE, encoded_value, parameters)
    }

    fn supports(&self, direction: FilterDirection) -> bool {
        self.function.supports(direction)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        ffi::CString,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    /// Encoding repeats the input `cd_values[0]` times, decoding keeps the first repetition.
    unsafe extern "C" fn repeat_filter(
        flags: c_uint,
        cd_nelmts: usize,
        cd_values: *const c_uint,
        nbytes: usize,
        buf_size: *mut usize,
        buf: *mut *mut c_void,
    ) -> usize {
        if cd_nelmts != 1 {
            return 0;
        }
        let count = *cd_values as usize;
        if count == 0 {
            return 0;
        }
        if flags & H5Z_FLAG_REVERSE == 0 {
            let size = nbytes * count;
            let out = libc::malloc(size.max(1)).cast::<u8>();
            for i in 0..count {
                std::ptr::copy_nonoverlapping((*buf).cast::<u8>(), out.add(i * nbytes), nbytes);
            }
            libc::free(*buf);
            *buf = out.cast();
            *buf_size = size.max(1);
            size
        } else {
            nbytes / count
        }
    }

    fn repeat_function() -> NativeFilterFunction {
        NativeFilterFunction {
            name: "repeat".to_string(),
            filter: repeat_filter,
            encoder_present: true,
            decoder_present: false,
        }
    }

    #[test]
    fn native_filter_function_invoke() {
        let function = repeat_function();
        assert!(function.supports(FilterDirection::Encode));
        assert!(!function.supports(FilterDirection::Decode));

        let encoded = function.invoke(0, vec![1, 2, 3], &[3]).unwrap();
        assert_eq!(encoded, vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);
        let decoded = function.invoke(H5Z_FLAG_REVERSE, encoded, &[3]).unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
    }

    #[test]
    fn native_filter_function_failure() {
        let function = repeat_function();
        assert!(matches!(
            function.invoke(0, vec![1, 2, 3], &[]),
            Err(PluginError::NativeFailure(name)) if name == "repeat"
        ));
        // An empty output is a failure by convention
        assert!(matches!(
            function.invoke(0, vec![], &[2]),
            Err(PluginError::NativeFailure(_))
        ));
    }

    static INITIALIZED: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn count_initialize() {
        INITIALIZED.fetch_add(1, Ordering::SeqCst);
    }

    fn codec_class(version: c_int, codecid: *const c_char, hdf5id: c_uint) -> NczCodec {
        NczCodec {
            version,
            sort: NCZ_CODEC_HDF5,
            codecid,
            hdf5id,
            codec_initialize: None,
            codec_finalize: None,
            codec_to_hdf5: std::ptr::null(),
            hdf5_to_codec: std::ptr::null(),
            modify_parameters: std::ptr::null(),
        }
    }

    #[test]
    fn native_codec_defaults() {
        let blosc = CString::new("blosc").unwrap();
        let repeat = CString::new("repeat").unwrap();
        let first = codec_class(NCZ_CODEC_CLASS_VER, blosc.as_ptr(), 32_001);
        let mut second = codec_class(NCZ_CODEC_CLASS_VER, repeat.as_ptr(), 40_100);
        second.codec_initialize = Some(count_initialize);
        let codecs = [
            &first as *const NczCodec,
            &second as *const NczCodec,
            std::ptr::null(),
        ];

        let native_codecs = unsafe { read_codec_defaults(Path::new("libblosc.so"), codecs.as_ptr()) };
        assert_eq!(native_codecs.len(), 2);
        assert_eq!(native_codecs[0].entry.id(), 32_001);
        assert_eq!(native_codecs[0].entry.name(), "blosc");
        assert!(native_codecs[0].entry.has_raw_parameters());
        assert!(native_codecs[0].entry.parameters().is_empty());
        assert!(native_codecs[0].initialize.is_none());
        assert_eq!(native_codecs[1].entry.id(), 40_100);

        // the initializer is only run by the loader
        assert_eq!(INITIALIZED.load(Ordering::SeqCst), 0);
        let initialize = native_codecs[1].initialize.unwrap();
        unsafe { initialize() };
        assert_eq!(INITIALIZED.load(Ordering::SeqCst), 1);

        assert!(unsafe { read_codec_defaults(Path::new("libblosc.so"), std::ptr::null()) }.is_empty());
    }

    #[test]
    fn native_codec_defaults_invalid_skipped() {
        let blosc = CString::new("blosc").unwrap();
        let unnamed = codec_class(NCZ_CODEC_CLASS_VER, std::ptr::null(), 32_001);
        let future = codec_class(NCZ_CODEC_CLASS_VER + 1, blosc.as_ptr(), 32_001);
        let mut other_sort = codec_class(NCZ_CODEC_CLASS_VER, blosc.as_ptr(), 32_001);
        other_sort.sort = NCZ_CODEC_HDF5 + 1;
        let valid = codec_class(NCZ_CODEC_CLASS_VER, blosc.as_ptr(), 32_001);
        let codecs = [
            &unnamed as *const NczCodec,
            &future as *const NczCodec,
            &other_sort as *const NczCodec,
            &valid as *const NczCodec,
            std::ptr::null(),
        ];
        let native_codecs = unsafe { read_codec_defaults(Path::new("libblosc.so"), codecs.as_ptr()) };
        assert_eq!(native_codecs.len(), 1);
        assert_eq!(native_codecs[0].entry.id(), 32_001);
    }

    #[test]
    fn native_plugin_loader_not_a_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!(
            "{}junk{}",
            std::env::consts::DLL_PREFIX,
            std::env::consts::DLL_SUFFIX
        ));
        std::fs::write(&path, b"not a shared library").unwrap();
        let result = NativePluginLoader::new().load(&path);
        assert!(matches!(result, Err(PluginLoadError::Library { .. })));
        assert_eq!(result.unwrap_err().path(), path);
    }
}
