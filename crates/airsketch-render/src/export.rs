//! PNG and EPS export of the committed stroke history.
//!
//! Both exporters take paper-space strokes and derive their own mapping at
//! export time. Nothing is reused from the display.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use airsketch_core::geometry::CoordinateMapper;
use airsketch_core::{PaperBounds, StrokeHistory};
use chrono::{DateTime, Utc};
use kurbo::{Point, Size};
use thiserror::Error;

use crate::pipeline::RenderPipeline;
use crate::pixmap::Pixmap;
use crate::surface::{InkStyle, RenderError};

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nothing to export")]
    EmptyHistory,
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("EPS formatting failed")]
    Format(#[from] std::fmt::Error),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Prefix of every export file name.
pub const FILE_PREFIX: &str = "airsketch";

/// A4 page size in PostScript points.
pub const EPS_PAGE: Size = Size::new(595.0, 842.0);
/// Fraction of the page the drawing may cover.
pub const EPS_FILL: f64 = 0.9;
/// Stroke width in points.
pub const EPS_LINE_WIDTH: f64 = 1.0;

/// Rasterize the history in black on white at `canvas` pixel size and encode it as PNG.
pub fn export_png(history: &StrokeHistory, bounds: &PaperBounds, canvas: Size) -> ExportResult<Vec<u8>> {
    if history.is_empty() {
        return Err(ExportError::EmptyHistory);
    }
    let pixmap = render_history(history, bounds, canvas)?;
    encode_png(&pixmap)
}

/// Rasterize the history with the export style.
pub fn render_history(history: &StrokeHistory, bounds: &PaperBounds, canvas: Size) -> ExportResult<Pixmap> {
    let mut pixmap = Pixmap::from_size(canvas)?;
    RenderPipeline::new(InkStyle::export()).redraw_all(&mut pixmap, bounds, history.iter());
    Ok(pixmap)
}

/// Encode an RGBA pixmap as PNG bytes.
pub fn encode_png(pixmap: &Pixmap) -> ExportResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, pixmap.width(), pixmap.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| ExportError::Encode(format!("Failed to write PNG header: {e}")))?;
        writer
            .write_image_data(pixmap.data())
            .map_err(|e| ExportError::Encode(format!("Failed to write PNG data: {e}")))?;
    }
    Ok(png_data)
}

/// Page mapping used by the EPS exporter.
///
/// Fits the bounds into [`EPS_FILL`] of the page, then flips the vertical
/// axis because PostScript puts the origin at the bottom-left.
#[derive(Debug, Clone, Copy)]
pub struct EpsPage {
    mapper: CoordinateMapper,
}

impl EpsPage {
    pub fn new(bounds: &PaperBounds) -> Self {
        let margin = (1.0 - EPS_FILL) / 2.0;
        Self {
            mapper: CoordinateMapper::with_margin(bounds, EPS_PAGE, margin),
        }
    }

    pub fn scale(&self) -> f64 {
        self.mapper.scale
    }

    pub fn to_page(&self, point: Point) -> Point {
        let p = self.mapper.to_screen(point);
        Point::new(p.x, EPS_PAGE.height - p.y)
    }

    pub fn to_paper(&self, page: Point) -> Point {
        self.mapper.to_paper(Point::new(page.x, EPS_PAGE.height - page.y))
    }
}

/// Build an EPS document with one path per stroke.
pub fn export_eps(history: &StrokeHistory, bounds: &PaperBounds, creation_date: &str) -> ExportResult<String> {
    if history.is_empty() {
        return Err(ExportError::EmptyHistory);
    }
    let page = EpsPage::new(bounds);

    let mut out = String::new();
    write_eps(&mut out, history, &page, creation_date)?;
    Ok(out)
}

fn write_eps(out: &mut String, history: &StrokeHistory, page: &EpsPage, creation_date: &str) -> std::fmt::Result {
    writeln!(out, "%!PS-Adobe-3.0 EPSF-3.0")?;
    writeln!(out, "%%BoundingBox: 0 0 {} {}", EPS_PAGE.width, EPS_PAGE.height)?;
    writeln!(out, "%%Creator: {FILE_PREFIX}")?;
    writeln!(out, "%%CreationDate: {creation_date}")?;
    writeln!(out, "%%Pages: 1")?;
    writeln!(out, "%%EndComments")?;
    writeln!(out, "/m {{ moveto }} bind def")?;
    writeln!(out, "/l {{ lineto }} bind def")?;
    writeln!(out, "/s {{ stroke }} bind def")?;
    writeln!(out, "1 setlinecap")?;
    writeln!(out, "1 setlinejoin")?;
    writeln!(out, "{EPS_LINE_WIDTH} setlinewidth")?;
    writeln!(out, "0 setgray")?;

    for stroke in history.iter() {
        let Some((first, rest)) = stroke.points().split_first() else {
            continue;
        };
        let start = page.to_page(*first);
        writeln!(out, "newpath")?;
        writeln!(out, "{:.2} {:.2} m", start.x, start.y)?;
        if rest.is_empty() {
            // Zero-length segment so round caps leave a dot.
            writeln!(out, "{:.2} {:.2} l", start.x, start.y)?;
        }
        for point in rest {
            let p = page.to_page(*point);
            writeln!(out, "{:.2} {:.2} l", p.x, p.y)?;
        }
        writeln!(out, "s")?;
    }

    writeln!(out, "showpage")?;
    writeln!(out, "%%EOF")
}

/// UTC timestamp like `2026-10-17T12:30:05.123Z`.
pub fn iso_timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// File name such as `airsketch_2026-10-17T12-30-05-123Z.png`.
pub fn export_file_name(extension: &str, time: SystemTime) -> String {
    let stamp = iso_timestamp(time).replace([':', '.'], "-");
    format!("{FILE_PREFIX}_{stamp}.{extension}")
}

/// Write export bytes into `dir`, creating it if needed.
pub fn write_export(dir: &Path, file_name: &str, bytes: &[u8]) -> ExportResult<PathBuf> {
    fs::create_dir_all(dir)
        .map_err(|e| ExportError::Io(format!("Failed to create {}: {}", dir.display(), e)))?;
    let path = dir.join(file_name);
    fs::write(&path, bytes).map_err(|e| ExportError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
    log::info!("Exported {}", path.display());
    Ok(path)
}
