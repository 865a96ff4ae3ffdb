//! SDK log file.
//!
//! The agent collects `GSDK_output_*.txt` files from the log folder, so
//! when logging is enabled the engine installs a `tracing` subscriber that
//! writes there. A host that already installed its own global subscriber
//! keeps it; the SDK's events then go wherever the host sends them.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Opens `<log_folder>/GSDK_output_<unix millis>.txt` and routes all
/// tracing output into it.
///
/// Returns the file path, or `None` if a global subscriber was already
/// installed and nothing was opened. An empty or uncreatable folder falls
/// back to the working directory.
pub(crate) fn install(log_folder: &str) -> io::Result<Option<PathBuf>> {
    if tracing::dispatcher::has_been_set() {
        debug!("global tracing subscriber already installed, not opening SDK log file");
        return Ok(None);
    }

    let name = file_name(chrono::Utc::now().timestamp_millis());
    let path = log_folder_or_cwd(log_folder).join(name);
    let file = File::create(&path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .try_init()
        .is_ok();

    // Lost a race with another installer; its subscriber stays.
    if !installed {
        return Ok(None);
    }
    Ok(Some(path))
}

fn file_name(unix_millis: i64) -> String {
    format!("GSDK_output_{unix_millis}.txt")
}

fn log_folder_or_cwd(log_folder: &str) -> PathBuf {
    if log_folder.trim().is_empty() {
        return PathBuf::from(".");
    }
    let folder = Path::new(log_folder);
    match fs::create_dir_all(folder) {
        Ok(()) => folder.to_path_buf(),
        Err(e) => {
            warn!(
                folder = %folder.display(),
                error = %e,
                "cannot create log folder, using working directory"
            );
            PathBuf::from(".")
        }
    }
}
