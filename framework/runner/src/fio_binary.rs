use std::env;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;

/// Environment variable to override the path to the fio binary.
pub const DISK_BENCH_FIO_PATH_ENV: &str = "DISK_BENCH_FIO_PATH";

/// Get the path to the fio binary.
///
/// If the [`DISK_BENCH_FIO_PATH_ENV`] environment variable is set, its value is used as the path
/// to fio. Otherwise fio is looked up in the user's `PATH`.
pub fn fio_path() -> anyhow::Result<PathBuf> {
    resolve_fio_path(env::var(DISK_BENCH_FIO_PATH_ENV).ok().as_deref())
}

/// Resolve the fio binary from an optional override value.
pub fn resolve_fio_path(override_path: Option<&str>) -> anyhow::Result<PathBuf> {
    match override_path {
        Some("") => {
            bail!("'{DISK_BENCH_FIO_PATH_ENV}' set to empty string");
        }
        Some("fio") | None => which::which("fio").with_context(|| {
            format!(
                "fio binary not found in PATH. Please install fio or set '{DISK_BENCH_FIO_PATH_ENV}' to the correct path."
            )
        }),
        Some(path) => {
            let fio_path = PathBuf::from(path);
            if !fio_path.exists() {
                bail!(
                    "Path to fio overridden with '{DISK_BENCH_FIO_PATH_ENV}={path}' but that path doesn't exist",
                    path = fio_path.display()
                );
            }
            Ok(fio_path)
        }
    }
}

/// Get the version of fio by running `fio --version`, for example `fio-3.36`.
pub fn fio_version(fio_path: &std::path::Path) -> anyhow::Result<String> {
    let output = std::process::Command::new(fio_path)
        .arg("--version")
        .output()
        .context("Failed to execute 'fio --version' command")?;
    if !output.status.success() {
        bail!(
            "'fio --version' command failed with exit code: {status}",
            status = output.status
        );
    }

    let output = String::from_utf8(output.stdout)
        .context("Failed to parse output of 'fio --version' command as UTF-8")?;

    match output.lines().map(str::trim).find(|line| !line.is_empty()) {
        Some(version) => Ok(version.to_string()),
        None => bail!("'fio --version' printed nothing"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn rejects_missing_override() {
        let result = resolve_fio_path(Some("/non/existent/path/to/fio"));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_override() {
        let err = resolve_fio_path(Some("")).unwrap_err();
        assert_eq!(err.to_string(), "'DISK_BENCH_FIO_PATH' set to empty string");
    }

    #[test]
    fn uses_existing_override() {
        let temp = NamedTempFile::new().expect("failed to create temp file");
        let test_path = temp.path().to_str().expect("failed to get temp file path");

        let result = resolve_fio_path(Some(test_path)).expect("failed to resolve fio path");
        assert_eq!(result, PathBuf::from(test_path));
    }

    #[cfg(unix)]
    fn script(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt as _;

        let path = dir.path().join("fio");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn reads_first_line_of_version_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(&dir, "echo\necho 'fio-3.36 '\necho extra");

        assert_eq!(fio_version(&path).unwrap(), "fio-3.36");
    }

    #[cfg(unix)]
    #[test]
    fn failing_version_command_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(&dir, "exit 3");

        assert!(fio_version(&path).is_err());
    }
}
