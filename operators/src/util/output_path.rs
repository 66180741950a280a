use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const CO_REGISTRATION_SUFFIX: &str = "_coregistered";
pub const COMPRESSION_SUFFIX: &str = "_compressed";
pub const RASTERIZATION_SUFFIX: &str = "_rasterized";

/// Inserts `suffix` between the file stem and the extension of `path`, e.g.
/// `data/child.tif` becomes `data/child_coregistered.tif`. Paths without extension get
/// the suffix appended.
pub fn derive_output_path(path: &Path, suffix: &str) -> PathBuf {
    let mut file_name = path
        .file_stem()
        .map(ToOwned::to_owned)
        .unwrap_or_default();
    file_name.push(suffix);

    if let Some(extension) = path.extension() {
        file_name.push(".");
        file_name.push(extension);
    }

    path.with_file_name(file_name)
}

/// Like [`derive_output_path`], but with a fixed extension instead of the input's one.
pub fn derive_output_path_with_extension(path: &Path, suffix: &str, extension: &str) -> PathBuf {
    let mut file_name: OsString = path
        .file_stem()
        .map(ToOwned::to_owned)
        .unwrap_or_default();
    file_name.push(suffix);
    file_name.push(".");
    file_name.push(extension);

    path.with_file_name(file_name)
}

/// The output path if one is given, otherwise the one derived from `input_path`.
pub fn output_path_or_derived(
    output_path: Option<&Path>,
    input_path: &Path,
    suffix: &str,
) -> PathBuf {
    output_path.map_or_else(|| derive_output_path(input_path, suffix), Path::to_path_buf)
}
