use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::Document;

/// Convert the markdown file at `input` into an html document at `output`.
///
/// The input is read fully and rendered in memory before anything is written.
/// The output is written to a temporary file next to `output` and then renamed
/// over it, so a failed run leaves no partial file behind.
pub fn convert(input: &Path, output: &Path, config: &Config) -> Result<()> {
    let renderer = config.renderer()?;

    debug!(input = %input.display(), "reading");
    let text = fs::read_to_string(input).map_err(|source| Error::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let doc = Document::from_path(input, text);

    debug!(policy = %config.policy, bytes = doc.text.len(), "rendering");
    let html = renderer.render(&doc)?;

    debug!(output = %output.display(), bytes = html.len(), "writing");
    write_atomic(output, html.as_bytes())?;

    info!(
        input = %input.display(),
        output = %output.display(),
        "converted"
    );
    Ok(())
}

/// Render `text` into a complete html document without touching the filesystem.
pub fn render_string(text: &str, title: &str, config: &Config) -> Result<String> {
    config.renderer()?.render(&Document::new(title, text))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let to_err = |source: io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    // a bare file name is relative to the current directory
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(to_err)?;
    tmp.write_all(bytes).map_err(to_err)?;
    tmp.as_file().sync_all().map_err(to_err)?;

    // the temporary file is created 0600, keep the mode of the file it replaces
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = fs::metadata(path)
            .map(|m| m.permissions().mode())
            .unwrap_or(0o644);
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(mode))
            .map_err(to_err)?;
    }

    tmp.persist(path).map_err(|e| to_err(e.error))?;
    Ok(())
}
