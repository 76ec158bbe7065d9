use std::fmt::Debug;
use std::path::{Path, PathBuf};

use genpdf::elements::{Break, Paragraph};
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Document, SimplePageDecorator};

use super::templates::RenderedDocument;

const PAGE_MARGIN_MM: i32 = 20;
const TITLE_FONT_SIZE: u8 = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("unable to load font family '{family}' from {dir}: {message}")]
    Fonts {
        family: String,
        dir: String,
        message: String,
    },
    #[error("pdf rendering failed: {0}")]
    Pdf(String),
}

/// Turns a resolved template into file bytes.
pub trait DocumentRenderer: Send + Sync + Debug {
    /// File extension of the produced artifact, without the dot.
    fn extension(&self) -> &'static str;
    fn render(&self, document: &RenderedDocument) -> Result<Vec<u8>, RenderError>;
}

/// Standalone HTML pages, used when no fonts are configured for PDF output.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl DocumentRenderer for HtmlRenderer {
    fn extension(&self) -> &'static str {
        "html"
    }

    fn render(&self, document: &RenderedDocument) -> Result<Vec<u8>, RenderError> {
        Ok(document.to_html().into_bytes())
    }
}

/// PDF output through genpdf. Expects `<family>-Regular.ttf`, `-Bold`, `-Italic` and
/// `-BoldItalic` files inside `font_dir`.
#[derive(Debug, Clone)]
pub struct GenPdfRenderer {
    font_dir: PathBuf,
    font_family: String,
}

impl GenPdfRenderer {
    pub fn new(font_dir: impl Into<PathBuf>, font_family: impl Into<String>) -> Self {
        Self {
            font_dir: font_dir.into(),
            font_family: font_family.into(),
        }
    }

    pub fn font_dir(&self) -> &Path {
        &self.font_dir
    }
}

impl DocumentRenderer for GenPdfRenderer {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, document: &RenderedDocument) -> Result<Vec<u8>, RenderError> {
        let family = genpdf::fonts::from_files(&self.font_dir, &self.font_family, None).map_err(
            |err| RenderError::Fonts {
                family: self.font_family.clone(),
                dir: self.font_dir.display().to_string(),
                message: err.to_string(),
            },
        )?;

        let mut pdf = Document::new(family);
        pdf.set_title(document.title.clone());

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(PAGE_MARGIN_MM);
        pdf.set_page_decorator(decorator);

        pdf.push(
            Paragraph::new(StyledString::new(
                document.title.clone(),
                Style::new().bold().with_font_size(TITLE_FONT_SIZE),
            ))
            .aligned(Alignment::Center),
        );
        pdf.push(Break::new(1.5));

        for paragraph in &document.paragraphs {
            pdf.push(Paragraph::new(paragraph.clone()));
            pdf.push(Break::new(0.5));
        }

        let mut buffer = Vec::new();
        pdf.render(&mut buffer)
            .map_err(|err| RenderError::Pdf(err.to_string()))?;
        Ok(buffer)
    }
}
