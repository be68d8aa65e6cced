//! # site-shooter
//!
//! Unattended visual-capture tool: renders configured web pages at configured
//! device viewports through an external renderer, clamps oversized
//! screenshots, and archives every capture into per-service, per-run folders
//! on Google Drive.
//!
//! A run walks every selected service, each of its devices, and each
//! orientation (normal, then flipped when the device asks for it), strictly
//! one job at a time. Each job renders with bounded retries, crops output
//! that exceeds the fixed bounds, uploads under a deterministic name, and
//! deletes its local files whatever the upload outcome. Job failures are
//! logged and the run continues; startup failures (configuration, remote
//! authentication, folder reconciliation) abort the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use site_shooter::{Archive, Config, DriveClient, PhantomRenderer, Shooter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(std::path::Path::new("config.yml"))?;
//!     let drive = config.global.google_drive.clone();
//!
//!     let mut archive = Archive::new(
//!         Box::new(DriveClient::new(drive.clone())),
//!         drive.parent_id,
//!         config.global.extension.clone(),
//!     );
//!     let services = config.selected(&[]);
//!     let names: Vec<String> = services.iter().map(|s| s.name.clone()).collect();
//!     archive.reconcile_folders(&names).await?;
//!
//!     let renderer = PhantomRenderer::new(
//!         config.global.renderer_binary.clone(),
//!         config.global.bridge_script.clone(),
//!     );
//!     let mut shooter = Shooter::new(&config.global, Box::new(renderer), archive);
//!     let summary = shooter.run(&services).await;
//!     println!("{} of {} jobs uploaded", summary.uploaded, summary.attempted);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # capture every configured service
//! site-shooter
//!
//! # restrict to named services, with verbose logging
//! site-shooter home admin --debug
//! ```

/// Remote folder hierarchy, run buckets, and upload naming
pub mod archive;

/// Command-line interface and logging setup
pub mod cli;

/// Typed configuration loaded from `config.yml`
pub mod config;

/// Narrow Google Drive client behind the `RemoteStore` trait
pub mod drive;

/// Error types
pub mod error;

/// Clamping of oversized screenshots
pub mod normalize;

/// Invocation of the external page renderer
pub mod renderer;

/// The sequential capture orchestrator
pub mod shooter;

/// Utility functions and helpers
pub mod utils;


pub use archive::*;
pub use cli::*;
pub use config::*;
pub use drive::*;
pub use error::*;
pub use normalize::*;
pub use renderer::*;
pub use shooter::*;
pub use utils::*;
