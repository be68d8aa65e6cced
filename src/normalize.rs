//! Clamping of oversized screenshots
//!
//! Full-page renders of long pages can come back tens of thousands of pixels
//! tall, which the remote store's preview pipeline rejects. Anything beyond
//! the fixed bounds is cropped down from the top-left corner; each dimension
//! clamps independently and nothing is ever enlarged.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::ShooterError;

pub const MAX_WIDTH: u32 = 4000;
pub const MAX_HEIGHT: u32 = 8000;

/// Filename prefix marking a cropped derivative.
pub const CROPPED_PREFIX: &str = "cropped-";

/// Inspects the image at `path`; returns the path to upload and whether a
/// cropped derivative was produced.
///
/// In-bounds images pass through untouched. Oversized images get a sibling
/// file named `cropped-<original>` holding the top-left
/// `min(w, 4000) x min(h, 8000)` region; the original stays on disk and the
/// caller owns deletion of both.
pub fn normalize(path: &Path) -> Result<(PathBuf, bool), ShooterError> {
    // Dimension probe only reads the header, no full decode.
    let (width, height) = image::image_dimensions(path)?;
    if width <= MAX_WIDTH && height <= MAX_HEIGHT {
        return Ok((path.to_path_buf(), false));
    }

    let crop_width = width.min(MAX_WIDTH);
    let crop_height = height.min(MAX_HEIGHT);

    let file_name = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", path.display()),
        )
    })?;

    let cropped_path = path.with_file_name(format!("{CROPPED_PREFIX}{file_name}"));

    let img = image::open(path)?;
    img.crop_imm(0, 0, crop_width, crop_height)
        .save(&cropped_path)?;

    Ok((cropped_path, true))
}
