//! Attestation documents — page layout plus a pluggable rendering backend.

pub mod pdf;

pub use pdf::PdfRenderer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::info;

use crate::error::DocumentError;
use crate::pipeline::extractor::ExtractedFields;

/// US Letter, in points.
pub const LETTER: (f32, f32) = (612.0, 792.0);

const LEFT_MARGIN: f32 = 100.0;
const TITLE_Y: f32 = 750.0;
const HEADING_Y: f32 = 720.0;
const FIRST_FIELD_Y: f32 = 700.0;
const LINE_STEP: f32 = 20.0;

/// One line of text at an absolute position (origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// A single page to render.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub lines: Vec<TextLine>,
}

impl PageLayout {
    pub fn new((width, height): (f32, f32)) -> Self {
        Self {
            width,
            height,
            lines: Vec::new(),
        }
    }

    pub fn text(&mut self, x: f32, y: f32, text: impl Into<String>) {
        self.lines.push(TextLine {
            x,
            y,
            text: text.into(),
        });
    }
}

/// Rendering backend: draw a page and save it.
pub trait DocumentRenderer: Send + Sync {
    /// File extension produced, without the dot.
    fn extension(&self) -> &str;

    fn render(&self, page: &PageLayout, path: &Path) -> Result<(), DocumentError>;
}

/// Deterministic file stem for a request label: whitespace becomes `_`.
pub fn document_file_stem(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Lay out the attestation page.
pub fn attestation_layout(label: &str, fields: &ExtractedFields, organization: &str) -> PageLayout {
    let mut page = PageLayout::new(LETTER);
    page.text(LEFT_MARGIN, TITLE_Y, format!("Attestation: {label}"));
    page.text(LEFT_MARGIN, HEADING_Y, "Details Provided:");

    let mut y = FIRST_FIELD_Y;
    for (key, value) in fields.present() {
        page.text(LEFT_MARGIN, y, format!("{key}: {value}"));
        y -= LINE_STEP;
    }
    page.text(LEFT_MARGIN, y - LINE_STEP, organization);
    page
}

/// Writes attestation documents under an output directory.
pub struct AttestationGenerator {
    output_dir: PathBuf,
    organization: String,
    renderer: Arc<dyn DocumentRenderer>,
}

impl AttestationGenerator {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        organization: impl Into<String>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            organization: organization.into(),
            renderer,
        }
    }

    /// Where the document for `label` is written.
    pub fn path_for(&self, label: &str) -> PathBuf {
        self.output_dir.join(format!(
            "{}.{}",
            document_file_stem(label),
            self.renderer.extension()
        ))
    }

    /// Render the attestation, overwriting any previous file for the same label.
    pub async fn generate(
        &self,
        label: &str,
        fields: &ExtractedFields,
    ) -> Result<PathBuf, DocumentError> {
        fs::create_dir_all(&self.output_dir).await?;
        let path = self.path_for(label);
        let page = attestation_layout(label, fields, &self.organization);
        self.renderer.render(&page, &path)?;
        info!(path = %path.display(), request_type = label, "Attestation generated");
        Ok(path)
    }
}
