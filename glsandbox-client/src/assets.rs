//! Shader sources.
//!
//! Sources are read from disk so they can be edited without rebuilding. The
//! copies in `shaders/` are embedded in the binary and used when a file is
//! missing.

use std::path::Path;

use include_dir::{Dir, include_dir};

static SHADERS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/shaders");

/// Returns the embedded shader named `name`, e.g. `flat.vert`.
pub fn embedded_shader(name: &str) -> anyhow::Result<&'static str> {
    SHADERS
        .get_file(name)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| anyhow::anyhow!("No embedded shader named '{name}'"))
}

/// Reads the shader at `path`, falling back to the embedded shader with the
/// same file name.
pub fn load_shader(path: &Path) -> anyhow::Result<String> {
    match std::fs::read_to_string(path) {
        Ok(source) => {
            log::debug!("Loaded shader {}", path.display());
            Ok(source)
        }
        Err(err) => {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid shader path {}", path.display()))?;
            let source = embedded_shader(name)
                .map_err(|_| anyhow::anyhow!("Failed to read shader {}: {err}", path.display()))?;
            log::warn!("Could not read {} ({err}), using the built-in copy", path.display());
            Ok(source.to_string())
        }
    }
}
