use std::path::Path;

use anyhow::Context;
use disk_bench_model::parse_size;
use sysinfo::Disks;

/// Bytes missing on `available` to hold a file of `required` bytes, if any.
pub fn space_shortfall(required: u64, available: u64) -> Option<u64> {
    required.checked_sub(available).filter(|missing| *missing > 0)
}

/// Free space on the filesystem holding `path`, if it is mounted on a known disk.
pub fn available_space(path: &Path) -> Option<u64> {
    let path = path.canonicalize().ok()?;
    let disks = Disks::new_with_refreshed_list();

    // The most specific mount point wins, `/` contains everything.
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

/// Warn when the scratch filesystem cannot hold the fio test file.
///
/// fio lays the file out before the timed section starts, so running out of space shows up as a
/// failed trial rather than as an error up front. This does not stop the run.
pub fn check_free_space(scratch_dir: &Path, file_size: &str) -> anyhow::Result<()> {
    let required = parse_size(file_size)
        .with_context(|| format!("Invalid file size '{file_size}'"))?;

    match available_space(scratch_dir) {
        Some(available) => {
            if let Some(missing) = space_shortfall(required, available) {
                log::warn!(
                    "{} has {} bytes free but the test file needs {required} bytes ({missing} bytes short), trials are likely to fail",
                    scratch_dir.display(),
                    available
                );
            } else {
                log::debug!("{} has {available} bytes free", scratch_dir.display());
            }
        }
        None => log::debug!(
            "Could not determine free space for {}",
            scratch_dir.display()
        ),
    }

    Ok(())
}
