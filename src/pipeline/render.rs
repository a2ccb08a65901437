//! Page rendering: turn an upload into one image per page.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is CPU-bound. Image decoding is CPU-bound too. Both run on
//! `tokio::task::spawn_blocking` so the async workers recognizing other pages
//! never stall.
//!
//! ## Why a temp file?
//!
//! Uploads arrive as bytes. pdfium opens PDFs by path, so the bytes are
//! written to a [`tempfile::NamedTempFile`] that lives only for the render
//! call and is removed on every exit path, including errors and panics.
//!
//! ## Sizing
//!
//! PDF pages are rendered at `dpi` (300 by default, the resolution OCR
//! engines are tuned for), but the longest edge is capped at
//! `max_rendered_pixels` so an A0 poster cannot exhaust memory. Raster
//! uploads larger than the cap are downscaled to fit.

use crate::config::VerifyConfig;
use crate::error::VerifyError;
use crate::pipeline::input::DocumentKind;
use crate::pipeline::recognize::PageImage;
use image::{imageops::FilterType, DynamicImage};
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// PDF user-space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Render an upload to page images, in page order.
pub async fn render_document(
    bytes: Vec<u8>,
    kind: DocumentKind,
    filename: &str,
    config: &VerifyConfig,
) -> Result<Vec<PageImage>, VerifyError> {
    let filename = filename.to_string();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let max_pages = config.max_pages;
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || match kind {
        DocumentKind::Pdf => render_pdf_blocking(
            &bytes,
            &filename,
            dpi,
            max_pixels,
            max_pages,
            password.as_deref(),
        ),
        DocumentKind::Image(format) => {
            decode_image_blocking(&bytes, format, &filename, max_pixels).map(|image| {
                vec![PageImage { page_num: 1, image }]
            })
        }
    })
    .await
    .map_err(|e| VerifyError::Internal(format!("Render task panicked: {}", e)))?
}

fn decode_image_blocking(
    bytes: &[u8],
    format: image::ImageFormat,
    filename: &str,
    max_pixels: u32,
) -> Result<DynamicImage, VerifyError> {
    let image = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        VerifyError::CorruptDocument {
            filename: filename.to_string(),
            kind: "image".to_string(),
            detail: e.to_string(),
        }
    })?;

    let image = if image.width().max(image.height()) > max_pixels {
        let resized = image.resize(max_pixels, max_pixels, FilterType::Lanczos3);
        debug!(
            "Downscaled {}x{} → {}x{}",
            image.width(),
            image.height(),
            resized.width(),
            resized.height()
        );
        resized
    } else {
        image
    };
    info!("Decoded image '{}': {}x{} px", filename, image.width(), image.height());
    Ok(image)
}

/// Bind pdfium from `PDFIUM_LIB_PATH` (a library file or the directory
/// holding it), falling back to the system library.
pub fn bind_pdfium() -> Result<Pdfium, VerifyError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => {
            let path = PathBuf::from(path);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| VerifyError::PdfiumBindingFailed(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

fn render_pdf_blocking(
    bytes: &[u8],
    filename: &str,
    dpi: u32,
    max_pixels: u32,
    max_pages: Option<usize>,
    password: Option<&str>,
) -> Result<Vec<PageImage>, VerifyError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("aegis-upload-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| VerifyError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| VerifyError::Internal(format!("tempfile write: {e}")))?;

    let pdfium = bind_pdfium()?;
    render_pdf_file(&pdfium, tmp.path(), filename, dpi, max_pixels, max_pages, password)
}

fn render_pdf_file(
    pdfium: &Pdfium,
    pdf_path: &Path,
    filename: &str,
    dpi: u32,
    max_pixels: u32,
    max_pages: Option<usize>,
    password: Option<&str>,
) -> Result<Vec<PageImage>, VerifyError> {
    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                VerifyError::WrongPassword {
                    filename: filename.to_string(),
                }
            } else {
                VerifyError::PasswordRequired {
                    filename: filename.to_string(),
                }
            }
        } else {
            VerifyError::CorruptDocument {
                filename: filename.to_string(),
                kind: "PDF".to_string(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let selected = max_pages.map_or(total_pages, |n| n.min(total_pages));
    info!(
        "PDF '{}' loaded: {} pages, rendering {}",
        filename, total_pages, selected
    );

    let mut results = Vec::with_capacity(selected);

    for idx in 0..selected {
        let page_num = idx + 1;
        let page = pages
            .get(idx as u16)
            .map_err(|e| VerifyError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let width = target_width(page.width().value, dpi, max_pixels);
        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_maximum_height(max_pixels as i32);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            VerifyError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        results.push(PageImage { page_num, image });
    }

    Ok(results)
}

/// Pixel width for a page `width_pts` wide at `dpi`, capped at `max_pixels`.
fn target_width(width_pts: f32, dpi: u32, max_pixels: u32) -> i32 {
    let px = (width_pts * dpi as f32 / POINTS_PER_INCH).round();
    if !px.is_finite() || px < 1.0 {
        return 1;
    }
    (px as u32).min(max_pixels) as i32
}
