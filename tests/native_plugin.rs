#![cfg(unix)]

use std::{
    error::Error,
    path::{Path, PathBuf},
    process::Command,
};

use zarrs_filters::{
    context::FilterContext,
    filter::{FilterChain, FilterError},
    metadata::{from_json, to_json_value},
    plugin::{FilterPluginTraits, Plugin, PluginError, PluginSource},
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

const XORSUM_ID: u32 = 40_200;

/// Compile the fixture plugin into `dir`, returning [`None`] if no C compiler is available.
fn compile_xorsum_plugin(dir: &Path) -> Option<PathBuf> {
    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/xorsum_plugin.c");
    let library = dir.join(format!(
        "{}xorsum{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    ));
    let compiler = std::env::var("CC").unwrap_or_else(|_| "cc".to_string());
    let status = Command::new(compiler)
        .args(["-shared", "-fPIC", "-o"])
        .arg(&library)
        .arg(&source)
        .status()
        .ok()?;
    status.success().then_some(library)
}

#[test]
fn native_plugin_discover_and_apply() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let Some(library) = compile_xorsum_plugin(dir.path()) else {
        eprintln!("skipping native_plugin_discover_and_apply: no C compiler");
        return Ok(());
    };

    let context = FilterContext::new();
    context.initialize()?;
    let report = context.discover(&[dir.path().to_path_buf()])?;
    assert_eq!(report.loaded, vec![XORSUM_ID]);
    assert!(report.warnings.is_empty());

    let plugin = context.lookup_plugin(XORSUM_ID)?;
    assert_eq!(plugin.name(), "xorsum filter");
    assert_eq!(plugin.source(), &PluginSource::Native(library));
    assert_eq!(plugin.version(), Plugin::new(0, "", Box::new(Identity)).version());
    drop(plugin);

    let codec = context.resolve_codec_by_name("xorsum")?;
    assert_eq!(codec.id(), XORSUM_ID);
    assert!(codec.has_raw_parameters());

    let json = serde_json::json!([{"codec": "xorsum", "configuration": {"parameters": [7]}}]);
    let mut chain = from_json(&context, 1, &json)?;
    assert_eq!(chain.ids(), vec![XORSUM_ID]);
    assert_eq!(chain.filters()[0].parameters(), &[7]);
    assert!(chain.setup(&context)?.is_empty());
    assert_eq!(to_json_value(&context, &chain), json);

    let bytes: Vec<u8> = (0..=255).collect();
    let encoded = chain.encode(bytes.clone())?;
    assert_eq!(encoded.len(), bytes.len() + 1);
    assert_eq!(encoded[0], 7);
    assert_eq!(encoded[256], 128);
    assert_eq!(chain.decode(encoded.clone())?, bytes);

    let mut corrupt = encoded;
    corrupt[256] ^= 1;
    assert!(matches!(
        chain.decode(corrupt),
        Err(FilterError::FilterExecutionFailure(_))
    ));

    // the raw codec accepts any parameter count, the filter function rejects it
    let mut unkeyed = FilterChain::new();
    unkeyed.add(&context, XORSUM_ID, vec![])?;
    unkeyed.setup(&context)?;
    assert!(matches!(
        unkeyed.encode(bytes),
        Err(FilterError::FilterExecutionFailure(_))
    ));

    context.finalize()?;
    assert!(matches!(
        chain.encode(vec![1]),
        Err(FilterError::UnresolvedFilter { id: XORSUM_ID, .. })
    ));
    Ok(())
}
