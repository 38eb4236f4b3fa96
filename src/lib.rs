//! The filter chain engine for [NCZarr](https://docs.unidata.ucar.edu/nug/current/nczarr_head.html) style Zarr storage of netCDF variables.
//!
//! Each stored variable carries an ordered chain of filters (compressors, checksums, and other transforms).
//! This crate maintains those chains, applies them to raw chunk bytes, and bridges between the two ways a filter is described:
//!  - an HDF5 filter identifier with a vector of `u32` parameters, as used by native HDF5 filter plugins, and
//!  - a JSON codec descriptor `{"codec": <name>, "configuration": {...}}`, as persisted in Zarr metadata.
//!
//! ## Getting Started
//! - A [`context::FilterContext`] holds the [plugin registry](plugin::PluginRegistry) and [codec catalog](codec_catalog::CodecCatalog). Most applications use [`context::global_filter_context`].
//! - Plugins are [discovered](context::FilterContext::discover_default) from shared libraries on the `HDF5_PLUGIN_PATH`, or installed from the [built-in plugins](plugin::builtin).
//! - A [`filter::FilterChain`] is built with [`add`](filter::FilterChain::add) or loaded from metadata with [`metadata::from_json`], then resolved with [`setup`](filter::FilterChain::setup) and applied with [`encode`](filter::FilterChain::encode) and [`decode`](filter::FilterChain::decode).
//!
//! ## Example
//! ```rust
//! # use zarrs_filters::{context::FilterContext, metadata};
//! let context = FilterContext::new();
//! context.initialize()?;
//! context.register_builtin_plugins()?;
//!
//! let codecs = serde_json::json!([
//!     {"codec": "shuffle"},
//!     {"codec": "fletcher32"},
//! ]);
//! let mut chain = metadata::from_json(&context, 4, &codecs)?;
//! assert!(chain.setup(&context)?.is_empty());
//!
//! let bytes: Vec<u8> = (0..64).collect();
//! let encoded = chain.encode(bytes.clone())?;
//! assert_eq!(chain.decode(encoded)?, bytes);
//! assert_eq!(
//!     metadata::to_json_value(&context, &chain)[0],
//!     serde_json::json!({"codec": "shuffle", "configuration": {"elementsize": 4}})
//! );
//! context.finalize()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate Features
//! #### Default
//!  - Built-in filters: `bz2`, `crc32c`, `gzip`, `zlib`, `zstd`.
//!
//! The `shuffle` and `fletcher32` built-in filters are always available.
//!
//! ## Licence
//! `zarrs_filters` is licensed under either of the Apache License, Version 2.0 or the MIT license, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
// #![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod codec_catalog;
pub mod config;
pub mod context;
pub mod filter;
pub mod metadata;
pub mod plugin;
