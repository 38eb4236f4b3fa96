use crate::filter::{
    FILTER_ID_BZIP2, FILTER_ID_CRC32C, FILTER_ID_DEFLATE, FILTER_ID_FLETCHER32, FILTER_ID_GZIP,
    FILTER_ID_LZ4, FILTER_ID_SHUFFLE, FILTER_ID_ZSTD,
};

use super::{CodecEntry, CodecParameter, ParameterDefault, ParameterKind};

fn unsigned(name: &str, default: ParameterDefault) -> CodecParameter {
    CodecParameter::new(name, ParameterKind::Unsigned, default)
}

/// Return the built-in codec entries.
///
/// These are registered whether or not a plugin is available for the filter, so chains using them can always be serialised by name.
///
/// | Codec | Filter | Parameters |
/// |-------|--------|------------|
/// | `zlib` | [`FILTER_ID_DEFLATE`] | `level` (default 1) |
/// | `shuffle` | [`FILTER_ID_SHUFFLE`] | `elementsize` (default: the variable type size) |
/// | `fletcher32` | [`FILTER_ID_FLETCHER32`] | |
/// | `bz2`, alias `bzip2` | [`FILTER_ID_BZIP2`] | `level` (default 9) |
/// | `lz4` | [`FILTER_ID_LZ4`] | `block_size` (default 0) |
/// | `zstd` | [`FILTER_ID_ZSTD`] | `level`, signed (default 3) |
/// | `gzip` | [`FILTER_ID_GZIP`] | `level` (default 1) |
/// | `crc32c` | [`FILTER_ID_CRC32C`] | |
#[must_use]
pub fn builtin_codecs() -> Vec<CodecEntry> {
    vec![
        CodecEntry::new(FILTER_ID_DEFLATE, "zlib")
            .with_parameter(unsigned("level", ParameterDefault::Value(1))),
        CodecEntry::new(FILTER_ID_SHUFFLE, "shuffle")
            .with_parameter(unsigned("elementsize", ParameterDefault::TypeSize)),
        CodecEntry::new(FILTER_ID_FLETCHER32, "fletcher32"),
        CodecEntry::new(FILTER_ID_BZIP2, "bz2")
            .with_alias("bzip2")
            .with_parameter(unsigned("level", ParameterDefault::Value(9))),
        CodecEntry::new(FILTER_ID_LZ4, "lz4")
            .with_parameter(unsigned("block_size", ParameterDefault::Value(0))),
        CodecEntry::new(FILTER_ID_ZSTD, "zstd").with_parameter(CodecParameter::new(
            "level",
            ParameterKind::Signed,
            ParameterDefault::Value(3),
        )),
        CodecEntry::new(FILTER_ID_GZIP, "gzip")
            .with_parameter(unsigned("level", ParameterDefault::Value(1))),
        CodecEntry::new(FILTER_ID_CRC32C, "crc32c"),
    ]
}
