//! Generation of the three-document package attached to every application.

pub mod package;
pub mod renderer;
pub mod store;
pub mod templates;

pub use package::{DocumentPackager, GeneratedFile, PackageError};
pub use renderer::{DocumentRenderer, GenPdfRenderer, HtmlRenderer, RenderError};
pub use store::{DocumentStore, FileSystemStore, StoreError, StoredFile};
pub use templates::{template_for, DocumentTemplate, RenderedDocument, TemplateError};
