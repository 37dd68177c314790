use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use eyre::Result;
use tracing::trace;

/// Write contents to a file on the disc, creating parent directories as needed
///
/// ```no_run
/// use evmc_common::utils::io::file::write_file;
///
/// let path = "/tmp/evmc/config.toml";
/// let contents = "max_call_depth = 1024";
/// let result = write_file(path, contents);
/// ```
pub fn write_file(path_str: &str, contents: &str) -> Result<()> {
    let path = Path::new(path_str);

    // Create the directory if it doesn't exist
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    trace!("wrote {} bytes to {}", contents.len(), path_str);

    Ok(())
}

/// Read contents from a file on the disc
///
/// ```no_run
/// use evmc_common::utils::io::file::read_file;
///
/// let path = "/tmp/evmc/config.toml";
/// let contents = read_file(path);
/// ```
pub fn read_file(path: &str) -> Result<String> {
    let path = Path::new(path);
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Delete a file from the disc. Returns `false` if nothing was deleted.
///
/// ```no_run
/// use evmc_common::utils::io::file::delete_path;
///
/// let path = "/tmp/evmc/config.toml";
/// let result = delete_path(path);
/// ```
pub fn delete_path(path: &str) -> bool {
    let path = Path::new(path);
    if path.is_dir() {
        std::fs::remove_dir_all(path).is_ok()
    } else {
        std::fs::remove_file(path).is_ok()
    }
}
