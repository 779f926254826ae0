use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::error::{Error, Result};

pub const DCIM_DIR: &str = "DCIM";
pub const RECORDINGS_DIR: &str = "100DSCIM";

/// Recording index -> absolute path, ordered by index.
pub type RecordingSet = BTreeMap<u32, PathBuf>;

static FILENAME_PAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^PICT(?P<index>\d{4,})\.AVI$").expect("valid regex"));

/// File name the receiver gives the recording with `index`.
pub fn dvr_filename(index: u32) -> String {
    format!("PICT{:04}.AVI", index)
}

/// Parses the recording index out of a file name, if it is one.
pub fn parse_dvr_filename(name: &str) -> Option<u32> {
    let caps = FILENAME_PAT.captures(name)?;
    caps["index"].parse().ok()
}

/// Verifies that `source_path` contains `DCIM/100DSCIM` and collects every
/// recording found directly inside it.
pub fn find_recordings(source_path: &Path) -> Result<RecordingSet> {
    if !source_path.exists() {
        return Err(Error::RootNotFound(source_path.to_path_buf()));
    }
    if !source_path.is_dir() {
        return Err(Error::RootNotDirectory(source_path.to_path_buf()));
    }
    let root = std::fs::canonicalize(source_path)?;

    let dcim_path = root.join(DCIM_DIR);
    if !dcim_path.is_dir() {
        return Err(Error::MissingDirectory { name: DCIM_DIR });
    }
    let input_path = dcim_path.join(RECORDINGS_DIR);
    if !input_path.is_dir() {
        return Err(Error::MissingDirectory {
            name: RECORDINGS_DIR,
        });
    }

    let mut recordings = RecordingSet::new();
    // Sorted so that index collisions (e.g. PICT0001.AVI vs PICT0001.avi)
    // resolve the same way on every filesystem.
    for entry in WalkDir::new(&input_path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let e = entry?;
        if !e.path().is_file() {
            continue;
        }
        let name = e.file_name().to_string_lossy();
        let Some(index) = parse_dvr_filename(&name) else {
            debug!("skipping non-recording entry {:?}", e.path());
            continue;
        };
        if let Some(previous) = recordings.insert(index, e.path().to_path_buf()) {
            warn!(
                "recording index {} appears more than once, using {:?} over {:?}",
                index,
                e.path(),
                previous
            );
        }
    }
    Ok(recordings)
}
