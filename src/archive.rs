//! Remote archive layout and upload naming
//!
//! Artifacts land in a two-level hierarchy under a fixed root folder:
//! one folder per service, and inside it one timestamp-named folder per
//! process run. Both folder-id caches live on the [`Archive`] instance and
//! last for the process lifetime.

use std::collections::HashMap;
use std::path::Path;

use chrono::{Duration, Local, NaiveDateTime};
use tracing::debug;

use crate::config::{Device, Service};
use crate::drive::RemoteStore;
use crate::error::ShooterError;
use crate::shooter::Orientation;

/// Fixed offset applied to run-bucket names and shoot times (KST).
pub const TIME_OFFSET_HOURS: i64 = 9;

pub struct Archive {
    store: Box<dyn RemoteStore>,
    root_id: String,
    extension: String,

    /// service name -> parent folder id, filled by [`Archive::reconcile_folders`]
    parents: HashMap<String, String>,

    /// service name -> run-bucket folder id, created lazily on first upload
    run_buckets: HashMap<String, String>,
}

impl Archive {
    pub fn new(store: Box<dyn RemoteStore>, root_id: String, extension: String) -> Self {
        Self {
            store,
            root_id,
            extension,
            parents: HashMap::new(),
            run_buckets: HashMap::new(),
        }
    }

    /// Ensures every selected service has exactly one parent folder under the
    /// root, reusing existing folders and creating the rest. Idempotent; run
    /// once per process before any capture.
    pub async fn reconcile_folders(&mut self, service_names: &[String]) -> Result<(), ShooterError> {
        for entry in self.store.list_folders(&self.root_id).await? {
            if service_names.contains(&entry.name) {
                debug!("found existing service folder `{}`", entry.name);
                self.parents.insert(entry.name, entry.id);
            }
        }

        for name in service_names {
            if self.parents.contains_key(name) {
                continue;
            }
            let folder = self
                .store
                .create_folder(name, std::slice::from_ref(&self.root_id))
                .await?;
            debug!("created service folder `{name}`");
            self.parents.insert(name.clone(), folder.id);
        }

        Ok(())
    }

    /// Uploads the artifact into the service's run bucket under its
    /// deterministic name. [`ShooterError::UploadMismatch`] when the store
    /// reports a different stored name than the one computed here.
    pub async fn upload(
        &mut self,
        path: &Path,
        service: &Service,
        device: &Device,
        size: (u32, u32),
        orientation: Orientation,
        cropped: bool,
    ) -> Result<(), ShooterError> {
        let filename = artifact_filename(&device.name, orientation, cropped, &self.extension);
        debug!("trying to upload `{filename}`");

        let bucket = self.run_bucket_id(&service.name).await?;
        let content = tokio::fs::read(path).await?;
        let description = upload_description(service, device, size, orientation);

        let stored = self
            .store
            .upload_file(
                content,
                &filename,
                guess_mimetype(&filename),
                std::slice::from_ref(&bucket),
                &description,
            )
            .await?;

        if stored.name != filename {
            return Err(ShooterError::UploadMismatch {
                expected: filename,
                actual: stored.name,
            });
        }

        Ok(())
    }

    /// The run-bucket folder id for a service, creating the folder on the
    /// first upload of the process. One bucket aggregates every artifact of a
    /// run for that service.
    async fn run_bucket_id(&mut self, service_name: &str) -> Result<String, ShooterError> {
        if let Some(id) = self.run_buckets.get(service_name) {
            return Ok(id.clone());
        }

        let parent = self.parents.get(service_name).cloned().ok_or_else(|| {
            ShooterError::Remote(format!(
                "no folder reconciled for service `{service_name}`"
            ))
        })?;

        let stamp = shoot_time().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        debug!("creating run bucket `{stamp}` for `{service_name}`");

        let bucket = self
            .store
            .create_folder(&stamp, std::slice::from_ref(&parent))
            .await?;
        self.run_buckets
            .insert(service_name.to_string(), bucket.id.clone());

        Ok(bucket.id)
    }
}

/// Local time shifted by the fixed archive offset.
pub fn shoot_time() -> NaiveDateTime {
    (Local::now() + Duration::hours(TIME_OFFSET_HOURS)).naive_local()
}

/// Deterministic artifact name:
/// `<device><-flipped if flipped><-cropped if cropped>.<extension>`.
///
/// The name carries neither timestamp nor pixel size, so two captures of the
/// same device/orientation/cropped state in one run bucket overwrite each
/// other.
pub fn artifact_filename(
    device: &str,
    orientation: Orientation,
    cropped: bool,
    extension: &str,
) -> String {
    format!(
        "{device}{flipped}{cropped}.{extension}",
        flipped = if orientation.is_flipped() { "-flipped" } else { "" },
        cropped = if cropped { "-cropped" } else { "" },
    )
}

pub fn guess_mimetype(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn upload_description(
    service: &Service,
    device: &Device,
    size: (u32, u32),
    orientation: Orientation,
) -> String {
    format!(
        "* size: {width}x{height}\n\
         * service: {service}\n\
         * device: {device}\n\
         * shooting time: {now} KST\n\
         * flipped: {flipped}\n",
        width = size.0,
        height = size.1,
        service = service.name,
        device = device.name,
        now = shoot_time().format("%Y-%m-%dT%H:%M:%S%.6f"),
        flipped = if orientation.is_flipped() { "yes" } else { "no" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_filename_plain() {
        assert_eq!(
            artifact_filename("iphone", Orientation::Normal, false, "jpg"),
            "iphone.jpg"
        );
    }

    #[test]
    fn test_artifact_filename_flipped_cropped() {
        assert_eq!(
            artifact_filename("iphone", Orientation::Flipped, true, "jpg"),
            "iphone-flipped-cropped.jpg"
        );
    }

    #[test]
    fn test_artifact_filename_cropped_only() {
        assert_eq!(
            artifact_filename("desktop", Orientation::Normal, true, "png"),
            "desktop-cropped.png"
        );
    }

    #[test]
    fn test_guess_mimetype() {
        assert_eq!(guess_mimetype("a.jpg"), "image/jpeg");
        assert_eq!(guess_mimetype("a.png"), "image/png");
        assert_eq!(guess_mimetype("a.bin"), "application/octet-stream");
    }

    #[test]
    fn test_description_block() {
        let service = Service {
            name: "home".to_string(),
            url: "https://example.com/".to_string(),
            devices: Vec::new(),
            schedule: None,
        };
        let device = Device {
            name: "iphone".to_string(),
            width: 375,
            height: 667,
            flip: true,
        };

        let description = upload_description(&service, &device, (667, 375), Orientation::Flipped);
        assert!(description.contains("* size: 667x375"));
        assert!(description.contains("* service: home"));
        assert!(description.contains("* device: iphone"));
        assert!(description.contains("* flipped: yes"));
    }
}
