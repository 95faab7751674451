//! Copy images to the system clipboard.
//!
//! Images are decoded with `image` (first frame for GIFs) and handed to the
//! clipboard as raw RGBA pixels.

use std::borrow::Cow;
use std::path::Path;

use anyhow::{Context, Result};
use arboard::{Clipboard, ImageData};

/// Decoded RGBA pixels ready for the clipboard
#[derive(Debug)]
pub struct RgbaPixels {
    pub width: usize,
    pub height: usize,
    pub bytes: Vec<u8>,
}

/// Decode an image file into RGBA pixels
pub fn load_rgba(path: &Path) -> Result<RgbaPixels> {
    let img = image::open(path)
        .with_context(|| format!("Failed to decode image {}", path.display()))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(RgbaPixels {
        width: width as usize,
        height: height as usize,
        bytes: rgba.into_raw(),
    })
}

/// Copy the image at `path` to the system clipboard
pub fn copy_image(path: &Path) -> Result<()> {
    let pixels = load_rgba(path)?;

    let mut clipboard = Clipboard::new().context("Failed to access clipboard")?;
    clipboard
        .set_image(ImageData {
            width: pixels.width,
            height: pixels.height,
            bytes: Cow::Owned(pixels.bytes),
        })
        .context("Failed to copy image to clipboard")?;

    log::info!("Copied {} to clipboard", path.display());
    Ok(())
}
