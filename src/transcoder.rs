use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;

use crate::error::{Error, Result};
use crate::pipeline::Stage;

/// The external program that does all of the actual media work.
///
/// Implementations block until the invocation finishes and report failure
/// only through the exit status.
pub trait Transcoder: Sync {
    fn run(&self, stage: Stage, args: &[OsString]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn run(&self, stage: Stage, args: &[OsString]) -> Result<()> {
        debug!("{}: {}", stage, command_line(&self.program, args));

        let status = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| Error::TranscoderSpawn {
                program: self.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(Error::Transcoder {
                stage,
                code: status.code(),
            });
        }
        Ok(())
    }
}

/// Argument list for one ffmpeg invocation, quiet unless something fails.
#[derive(Debug, Clone)]
pub struct FfmpegArgs {
    args: Vec<OsString>,
}

impl FfmpegArgs {
    pub fn new() -> Self {
        let mut args = Self { args: Vec::new() };
        args.arg("-hide_banner").arg("-loglevel").arg("error");
        args
    }

    pub fn arg(&mut self, arg: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn opt(&mut self, name: &str, value: impl AsRef<OsStr>) -> &mut Self {
        self.arg(name).arg(value)
    }

    pub fn into_vec(self) -> Vec<OsString> {
        self.args
    }
}

impl Default for FfmpegArgs {
    fn default() -> Self {
        Self::new()
    }
}

pub fn command_line(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
