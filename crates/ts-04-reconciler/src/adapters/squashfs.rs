//! squashfs Packager Adapter
//!
//! Implements `VolumePackager` by running `mksquashfs` into a temp file.

use crate::domain::ReconcileError;
use crate::ports::outbound::{PackagedVolume, VolumePackager};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Default packager binary.
pub const DEFAULT_MKSQUASHFS: &str = "mksquashfs";

/// Builds squashfs images with an external `mksquashfs`.
#[derive(Clone, Debug)]
pub struct SquashfsPackager {
    program: String,
    extra_args: Vec<String>,
}

impl Default for SquashfsPackager {
    fn default() -> Self {
        Self::new(DEFAULT_MKSQUASHFS)
    }
}

impl SquashfsPackager {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Use `TS_MKSQUASHFS` as the binary when set.
    pub fn from_env() -> Self {
        std::env::var("TS_MKSQUASHFS")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(Self::new)
            .unwrap_or_default()
    }

    /// Append arguments after the fixed `<src> <dst> -noappend`.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }
}

#[async_trait]
impl VolumePackager for SquashfsPackager {
    async fn package(&self, source: &Path) -> Result<PackagedVolume, ReconcileError> {
        let image = tempfile::Builder::new()
            .prefix("ts-volume-")
            .suffix(".squashfs")
            .tempfile()?
            .into_temp_path();

        debug!(program = %self.program, source = %source.display(), image = %image.display(), "Packaging volume");

        let output = Command::new(&self.program)
            .arg(source)
            .arg(&*image)
            .arg("-noappend")
            .args(&self.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ReconcileError::Packaging(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReconcileError::Packaging(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let size = tokio::fs::metadata(&*image).await?.len();
        info!(source = %source.display(), size, "Volume packaged");

        Ok(PackagedVolume { path: image, size })
    }
}
