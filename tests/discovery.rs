use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use tracing_test::traced_test;
use zarrs_filters::{
    codec_catalog::{CodecEntry, CodecParameter, ParameterDefault, ParameterKind},
    context::FilterContext,
    filter::FILTER_ID_DEFLATE,
    plugin::{
        FilterPluginTraits, Plugin, PluginError, PluginLoadError, PluginLoaderTraits,
        PluginSource,
    },
};

#[derive(Debug)]
struct Identity;

impl FilterPluginTraits for Identity {
    fn encode(&self, decoded_value: Vec<u8>, _: &[u32]) -> Result<Vec<u8>, PluginError> {
        Ok(decoded_value)
    }

    fn decode(&self, encoded_value: Vec<u8>, _: &[u32]) -> Result<Vec<u8>, PluginError> {
        Ok(encoded_value)
    }
}

/// Loads "plugins" from text files of the form `PLUGIN:<id>:<codec name>`.
struct TextPluginLoader;

impl PluginLoaderTraits for TextPluginLoader {
    fn load(&self, path: &Path) -> Result<Plugin, PluginLoadError> {
        let invalid = |reason: &str| PluginLoadError::InvalidDescriptor {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        let contents = fs::read_to_string(path).map_err(|_| invalid("unreadable"))?;
        let mut fields = contents.trim().split(':');
        if fields.next() != Some("PLUGIN") {
            return Err(invalid("missing magic"));
        }
        let id: u32 = fields
            .next()
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| invalid("invalid identifier"))?;
        let codec = fields.next().ok_or_else(|| invalid("missing codec"))?;
        let defaults = vec![CodecEntry::new(id, codec).with_parameter(CodecParameter::new(
            "factor",
            ParameterKind::Unsigned,
            ParameterDefault::Value(2),
        ))];
        Ok(Plugin::new(id, codec, Box::new(Identity)).with_codec_defaults(defaults))
    }
}

fn library_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!(
        "{}{stem}{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    ))
}

#[traced_test]
#[test]
fn discovery_valid_and_invalid_candidates() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(library_path(dir.path(), "valid"), "PLUGIN:40000:valid")?;
    fs::write(library_path(dir.path(), "invalid"), "not a plugin")?;
    fs::write(dir.path().join("README.txt"), "PLUGIN:40001:ignored")?;

    let context = FilterContext::new();
    context.initialize()?;
    let report = context.discover_with_loader(&TextPluginLoader, &[dir.path().to_path_buf()])?;
    assert_eq!(report.loaded, vec![40_000]);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(
        report.warnings[0].path(),
        library_path(dir.path(), "invalid")
    );
    assert!(logs_contain("skipping plugin candidate"));

    assert_eq!(context.plugin_ids(), vec![40_000]);
    let plugin = context.lookup_plugin(40_000)?;
    assert_eq!(
        plugin.source(),
        &PluginSource::Native(library_path(dir.path(), "valid"))
    );
    let codec = context.resolve_codec_by_name("valid")?;
    assert_eq!(codec.id(), 40_000);
    assert_eq!(codec.parameters()[0].default(), &ParameterDefault::Value(2));
    Ok(())
}

#[traced_test]
#[test]
fn discovery_first_plugin_wins() -> Result<(), Box<dyn Error>> {
    let first = tempfile::tempdir()?;
    let second = tempfile::tempdir()?;
    fs::write(library_path(first.path(), "a"), "PLUGIN:40000:first")?;
    fs::write(library_path(second.path(), "a"), "PLUGIN:40000:second")?;
    // the zlib codec is already in the catalog
    fs::write(
        library_path(second.path(), "b"),
        format!("PLUGIN:{FILTER_ID_DEFLATE}:deflate"),
    )?;

    let context = FilterContext::new();
    context.initialize()?;
    let report = context.discover_with_loader(
        &TextPluginLoader,
        &[first.path().to_path_buf(), second.path().to_path_buf()],
    )?;
    assert_eq!(report.loaded, vec![40_000, FILTER_ID_DEFLATE]);
    assert!(matches!(
        report.warnings.as_slice(),
        [PluginLoadError::DuplicateIdentifier { id: 40_000, .. }]
    ));
    assert_eq!(context.lookup_plugin(40_000)?.name(), "first");
    assert!(context.resolve_codec_by_name("second").is_err());
    assert!(context.resolve_codec_by_name("deflate").is_err());
    assert_eq!(context.resolve_codec_by_id(FILTER_ID_DEFLATE)?.name(), "zlib");
    assert!(logs_contain("already registered"));
    Ok(())
}

#[test]
fn discovery_native_loader_rejects_non_library() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(library_path(dir.path(), "junk"), b"\x00junk")?;

    let context = FilterContext::new();
    context.initialize()?;
    let report = context.discover(&[dir.path().to_path_buf(), dir.path().join("missing")])?;
    assert!(report.loaded.is_empty());
    assert!(matches!(
        report.warnings.as_slice(),
        [PluginLoadError::Library { .. }]
    ));
    assert!(context.plugin_ids().is_empty());
    Ok(())
}
