use std::path::Path;

use anyhow::Context;

#[cfg(target_os = "macos")]
const OPENER: &str = "open";
#[cfg(not(target_os = "macos"))]
const OPENER: &str = "xdg-open";

/// Open a generated plot with the desktop's default handler for HTML files.
pub fn open_in_browser(path: &Path) -> anyhow::Result<()> {
    let opener = which::which(OPENER)
        .with_context(|| format!("'{OPENER}' not found in PATH, open {} manually", path.display()))?;
    let path = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;

    log::debug!("Opening {} with {}", path.display(), opener.display());
    std::process::Command::new(opener)
        .arg(&path)
        .spawn()
        .with_context(|| format!("Failed to open {}", path.display()))?;

    Ok(())
}
