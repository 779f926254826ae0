use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Input list for ffmpeg's concat demuxer, one `file '<path>'` line per
/// segment in playback order.
#[derive(Debug, Clone, Default)]
pub struct ConcatManifest {
    pub entries: Vec<PathBuf>,
}

impl ConcatManifest {
    pub fn new(entries: Vec<PathBuf>) -> Self {
        Self { entries }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for path in &self.entries {
            out.push_str("file '");
            out.push_str(&quote(&path.to_string_lossy()));
            out.push_str("'\r\n");
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        w.write_all(self.render().as_bytes())?;
        w.flush()?;
        Ok(())
    }
}

// The demuxer's quoting: a quote inside '...' becomes '\''.
fn quote(s: &str) -> String {
    s.replace('\'', r"'\''")
}
