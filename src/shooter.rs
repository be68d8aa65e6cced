//! Capture orchestration
//!
//! The driver walks every selected service, its devices, and their
//! orientations strictly in order, one job at a time. A job renders with
//! bounded retries, clamps the result, uploads it, and always deletes its
//! local files. Job failures are logged and never abort the run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::archive::Archive;
use crate::config::{Device, GlobalConfig, Service};
use crate::error::ShooterError;
use crate::normalize::normalize;
use crate::renderer::Render;
use crate::utils::format_duration;

/// Retries after the initial render attempt, so up to 11 invocations per job.
pub const MAX_RETRIES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Normal,
    Flipped,
}

impl Orientation {
    pub fn is_flipped(self) -> bool {
        matches!(self, Orientation::Flipped)
    }

    /// The capture size for this orientation; flipped swaps width and height.
    pub fn apply(self, (width, height): (u32, u32)) -> (u32, u32) {
        match self {
            Orientation::Normal => (width, height),
            Orientation::Flipped => (height, width),
        }
    }
}

/// Per-run outcome counts, for end-of-run logging only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub uploaded: usize,
    pub render_failed: usize,
    pub upload_failed: usize,
}

pub struct Shooter {
    output_directory: PathBuf,
    extension: String,
    headers: BTreeMap<String, String>,
    renderer: Box<dyn Render>,
    archive: Archive,
}

impl Shooter {
    pub fn new(global: &GlobalConfig, renderer: Box<dyn Render>, archive: Archive) -> Self {
        Self {
            output_directory: global.output_directory.clone(),
            extension: global.extension.clone(),
            headers: global.headers.clone(),
            renderer,
            archive,
        }
    }

    /// Runs every job for the given services sequentially and returns the
    /// outcome counts.
    pub async fn run(&mut self, services: &[Service]) -> RunSummary {
        let mut summary = RunSummary::default();

        for service in services {
            debug!("> service `{}`", service.name);

            for device in &service.devices {
                debug!("  device `{}`", device.name);

                for orientation in orientations(device) {
                    summary.attempted += 1;

                    match self.capture(service, device, orientation).await {
                        Ok(()) => summary.uploaded += 1,
                        Err(e) if e.is_render_failure() => {
                            error!(
                                "failed to render `{}` for device `{}`: {e}",
                                service.name, device.name
                            );
                            summary.render_failed += 1;
                        }
                        Err(e) => {
                            error!(
                                "failed to archive `{}` for device `{}`: {e}",
                                service.name, device.name
                            );
                            summary.upload_failed += 1;
                        }
                    }
                }

                debug!("  device `{}` done", device.name);
            }

            debug!("< service `{}` done", service.name);
        }

        summary
    }

    async fn capture(
        &mut self,
        service: &Service,
        device: &Device,
        orientation: Orientation,
    ) -> Result<(), ShooterError> {
        let size = orientation.apply(device.size());
        debug!("  size {}x{} ({orientation:?})", size.0, size.1);

        tokio::fs::create_dir_all(&self.output_directory).await?;
        let output = self
            .output_directory
            .join(format!("{}.{}", Uuid::new_v4().simple(), self.extension));

        let render_started = Instant::now();
        let mut failed_count = 0;
        let rendered = loop {
            if failed_count > MAX_RETRIES {
                break Ok(false);
            }
            match self
                .renderer
                .render(&service.url, &output, size, &self.headers)
                .await
            {
                Ok(true) => break Ok(true),
                Ok(false) => failed_count += 1,
                Err(e) => break Err(e),
            }
        };

        let rendered = match rendered {
            Ok(done) => done,
            Err(e) => {
                remove_if_exists(&output).await;
                return Err(e);
            }
        };
        if !rendered {
            // The renderer may have left a partial file behind.
            remove_if_exists(&output).await;
            return Err(ShooterError::RenderFailed {
                attempts: failed_count,
            });
        }
        debug!("  {} spent to render", format_duration(render_started.elapsed()));

        let upload_started = Instant::now();
        let normalized = normalize(&output);
        let uploaded = match &normalized {
            Ok((path, cropped)) => {
                self.archive
                    .upload(path, service, device, size, orientation, *cropped)
                    .await
            }
            // A broken image never reaches the store; the error surfaces
            // below, after cleanup.
            Err(_) => Ok(()),
        };

        // Both deletions are unconditional once the upload was attempted.
        remove_if_exists(&output).await;
        if let Ok((path, _)) = &normalized {
            if path != &output {
                remove_if_exists(path).await;
            }
        }
        normalized?;
        uploaded?;

        debug!("  {} spent to upload", format_duration(upload_started.elapsed()));
        Ok(())
    }
}

fn orientations(device: &Device) -> Vec<Orientation> {
    if device.flip {
        vec![Orientation::Normal, Orientation::Flipped]
    } else {
        vec![Orientation::Normal]
    }
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove `{}`: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_apply() {
        assert_eq!(Orientation::Normal.apply((200, 100)), (200, 100));
        assert_eq!(Orientation::Flipped.apply((200, 100)), (100, 200));
    }

    #[test]
    fn test_orientations_honor_flip_flag() {
        let device = Device {
            name: "iphone".to_string(),
            width: 375,
            height: 667,
            flip: true,
        };
        assert_eq!(
            orientations(&device),
            vec![Orientation::Normal, Orientation::Flipped]
        );

        let fixed = Device {
            flip: false,
            ..device
        };
        assert_eq!(orientations(&fixed), vec![Orientation::Normal]);
    }
}
