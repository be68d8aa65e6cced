//! Invocation of the external page renderer
//!
//! The renderer is an opaque external process: it either writes an image to
//! the destination path and exits 0, or it fails. On failure the destination
//! file may or may not exist. Retry policy lives in the orchestrator, not
//! here.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::ShooterError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Render: Send + Sync {
    /// Single-attempt render of `url` into `destination` at `size` pixels.
    /// Returns whether the renderer exited successfully.
    async fn render(
        &self,
        url: &str,
        destination: &Path,
        size: (u32, u32),
        headers: &BTreeMap<String, String>,
    ) -> Result<bool, ShooterError>;
}

/// Shells out to the PhantomJS binary with the bridging script.
pub struct PhantomRenderer {
    binary: PathBuf,
    bridge_script: PathBuf,
}

impl PhantomRenderer {
    pub fn new(binary: PathBuf, bridge_script: PathBuf) -> Self {
        Self {
            binary,
            bridge_script,
        }
    }

    /// Arguments after the binary itself:
    /// `<bridge-script> <url> <destination> --viewport WxH [--header "K: V"]*`
    ///
    /// Headers are emitted in sorted key order so the argv is deterministic.
    pub fn command_args(
        &self,
        url: &str,
        destination: &Path,
        size: (u32, u32),
        headers: &BTreeMap<String, String>,
    ) -> Vec<String> {
        let mut args = vec![
            self.bridge_script.to_string_lossy().into_owned(),
            url.to_string(),
            destination.to_string_lossy().into_owned(),
            "--viewport".to_string(),
            format!("{}x{}", size.0, size.1),
        ];

        for (key, value) in headers {
            args.push("--header".to_string());
            args.push(format!("{key}: {value}"));
        }

        args
    }
}

#[async_trait]
impl Render for PhantomRenderer {
    async fn render(
        &self,
        url: &str,
        destination: &Path,
        size: (u32, u32),
        headers: &BTreeMap<String, String>,
    ) -> Result<bool, ShooterError> {
        let args = self.command_args(url, destination, size, headers);
        debug!("invoking `{}` {:?}", self.binary.display(), args);

        let status = Command::new(&self.binary)
            .args(&args)
            .stdout(Stdio::null())
            .status()
            .await?;

        Ok(status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> PhantomRenderer {
        PhantomRenderer::new(
            PathBuf::from("/usr/local/bin/phantomjs"),
            PathBuf::from("/opt/renderURL.js"),
        )
    }

    #[test]
    fn test_command_args_shape() {
        let args = renderer().command_args(
            "https://example.com/",
            Path::new("/tmp/out.jpg"),
            (1920, 1080),
            &BTreeMap::new(),
        );

        assert_eq!(
            args,
            vec![
                "/opt/renderURL.js",
                "https://example.com/",
                "/tmp/out.jpg",
                "--viewport",
                "1920x1080",
            ]
        );
    }

    #[test]
    fn test_command_args_headers_sorted() {
        let mut headers = BTreeMap::new();
        headers.insert("X-Shooter".to_string(), "1".to_string());
        headers.insert("Accept-Language".to_string(), "ko".to_string());

        let args = renderer().command_args(
            "https://example.com/",
            Path::new("/tmp/out.jpg"),
            (600, 600),
            &headers,
        );

        let tail = &args[5..];
        assert_eq!(
            tail,
            [
                "--header",
                "Accept-Language: ko",
                "--header",
                "X-Shooter: 1",
            ]
        );
    }
}
