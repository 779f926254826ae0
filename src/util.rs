use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Runs `ffmpeg -version` once before any real work. Called only after the
/// card layout and range are validated, so user mistakes are reported even
/// when ffmpeg is missing.
pub fn ensure_ffmpeg_available(ffmpeg: &Path) -> Result<()> {
    let out = Command::new(ffmpeg)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to run {} -version", ffmpeg.display()))?;
    if !out.status.success() {
        bail!(
            "{} exists but returned non-zero on -version",
            ffmpeg.display()
        );
    }
    Ok(())
}

pub fn fmt_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}
