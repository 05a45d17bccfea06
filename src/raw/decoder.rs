//! RAW decoder collaborators
//!
//! Decoding happens in an external process that writes an uncompressed TIFF
//! to stdout. Stdout is wired straight into the baseline scratch file, so the
//! baseline never passes through engine memory. Stderr goes to an unnamed
//! temp file next to it so a chatty decoder can never fill a pipe and stall.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use crate::config::RawConfig;
use crate::engine::{Deadline, ScratchFile};
use crate::error::CompressionError;

/// Poll interval while waiting for the decoder process
const WAIT_POLL: Duration = Duration::from_millis(20);

/// Longest stderr tail carried into an error message
const STDERR_EXCERPT: u64 = 512;

/// Produces an uncompressed baseline from a camera RAW file
pub trait RawDecoder: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Decode `source` into `baseline`, returning the baseline size in bytes
    ///
    /// Unavailability and failure are both `RawDecodeUnavailable`; they are
    /// never silently degraded.
    fn decode(
        &self,
        source: &Path,
        baseline: &mut ScratchFile,
        deadline: &Deadline,
    ) -> Result<u64, CompressionError>;
}

/// `dcraw`-compatible subprocess decoder
#[derive(Debug, Clone)]
pub struct DcrawDecoder {
    program: String,
    args: Vec<String>,
}

impl DcrawDecoder {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &RawConfig) -> Self {
        Self::new(config.decoder_program.clone(), config.decoder_args.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn spawn(
        &self,
        source: &Path,
        baseline: &ScratchFile,
        stderr: &File,
    ) -> Result<Child, CompressionError> {
        let stdout = baseline.handle()?;
        Command::new(&self.program)
            .args(&self.args)
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr.try_clone()?))
            .spawn()
            .map_err(|e| {
                let reason = if e.kind() == ErrorKind::NotFound {
                    format!("decoder '{}' is not installed", self.program)
                } else {
                    format!("failed to start decoder '{}': {}", self.program, e)
                };
                CompressionError::raw_decode_unavailable(source.display().to_string(), reason)
            })
    }
}

/// Unnamed file in the baseline's directory, gone once the handle drops
fn stderr_sink(baseline: &ScratchFile) -> Result<File, CompressionError> {
    let file = match baseline.path().parent() {
        Some(dir) => tempfile::tempfile_in(dir)?,
        None => tempfile::tempfile()?,
    };
    Ok(file)
}

/// Last [`STDERR_EXCERPT`] bytes the decoder wrote, trimmed
fn stderr_tail(sink: &mut File) -> String {
    let mut tail = Vec::new();
    let read = sink
        .seek(SeekFrom::End(0))
        .and_then(|len| sink.seek(SeekFrom::Start(len.saturating_sub(STDERR_EXCERPT))))
        .and_then(|_| sink.read_to_end(&mut tail));
    if read.is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&tail).trim().to_string()
}

impl Default for DcrawDecoder {
    fn default() -> Self {
        Self::from_config(&RawConfig::default())
    }
}

impl RawDecoder for DcrawDecoder {
    fn name(&self) -> &str {
        &self.program
    }

    fn decode(
        &self,
        source: &Path,
        baseline: &mut ScratchFile,
        deadline: &Deadline,
    ) -> Result<u64, CompressionError> {
        let source_label = source.display().to_string();
        let mut stderr = stderr_sink(baseline)?;
        let mut child = self.spawn(source, baseline, &stderr)?;

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if deadline.is_expired() {
                tracing::warn!(
                    decoder = %self.program,
                    source = %source_label,
                    "RAW decoder exceeded deadline, killing it"
                );
                let _ = child.kill();
                let _ = child.wait();
                deadline.check()?;
            }
            std::thread::sleep(WAIT_POLL);
        };

        if !status.success() {
            let excerpt = stderr_tail(&mut stderr);
            let reason = if excerpt.is_empty() {
                format!("decoder exited with {}", status)
            } else {
                format!("decoder exited with {}: {}", status, excerpt)
            };
            return Err(CompressionError::raw_decode_unavailable(source_label, reason));
        }

        let size = baseline.len()?;
        if size == 0 {
            return Err(CompressionError::raw_decode_unavailable(
                source_label,
                "decoder produced no output",
            ));
        }

        tracing::debug!(
            decoder = %self.program,
            source = %source_label,
            baseline_size = size,
            "RAW decoder finished"
        );
        Ok(size)
    }
}
