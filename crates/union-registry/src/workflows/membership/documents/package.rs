use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDate, Utc};
use tracing::warn;

use super::renderer::{DocumentRenderer, RenderError};
use super::store::{DocumentStore, StoreError, StoredFile};
use super::templates::{template_fields, template_for, TemplateError};
use crate::workflows::membership::domain::{ApplicationRecord, DocumentKind};

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("rendering {kind:?} failed: {source}")]
    Render {
        kind: DocumentKind,
        source: RenderError,
    },
    #[error("storing document failed: {0}")]
    Store(#[from] StoreError),
}

static BUILD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// One stored artifact of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub kind: DocumentKind,
    pub file: StoredFile,
}

/// Renders and stores the three-document package of an application as one unit.
#[derive(Debug)]
pub struct DocumentPackager {
    renderer: Box<dyn DocumentRenderer>,
    store: Box<dyn DocumentStore>,
}

impl DocumentPackager {
    pub fn new(renderer: Box<dyn DocumentRenderer>, store: Box<dyn DocumentStore>) -> Self {
        Self { renderer, store }
    }

    /// Every document renders before anything is written. A failed write removes the files
    /// already written for this package.
    pub fn build(
        &self,
        application: &ApplicationRecord,
        organization_name: &str,
        issued_on: NaiveDate,
    ) -> Result<Vec<GeneratedFile>, PackageError> {
        let fields = template_fields(application, organization_name, issued_on);

        let mut rendered = Vec::with_capacity(DocumentKind::ALL.len());
        for kind in DocumentKind::ALL {
            let document = template_for(kind).render(&fields)?;
            let bytes = self
                .renderer
                .render(&document)
                .map_err(|source| PackageError::Render { kind, source })?;
            rendered.push((kind, bytes));
        }

        let stamp = Utc::now().timestamp_millis();
        let build = BUILD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let mut written: Vec<GeneratedFile> = Vec::with_capacity(rendered.len());
        for (kind, bytes) in rendered {
            let file_name = format!(
                "{}-{}-{stamp}-{build}.{}",
                application.id.0,
                kind.slug(),
                self.renderer.extension()
            );
            match self.store.store(&file_name, &bytes) {
                Ok(file) => written.push(GeneratedFile { kind, file }),
                Err(err) => {
                    self.discard(&written);
                    return Err(err.into());
                }
            }
        }

        Ok(written)
    }

    /// Best-effort removal of stored files; failures are logged.
    pub fn discard(&self, files: &[GeneratedFile]) {
        for generated in files {
            if let Err(err) = self.store.remove(&generated.file) {
                warn!(error = %err, path = %generated.file.path, "unable to remove document file");
            }
        }
    }

    pub(crate) fn discard_paths(&self, files: impl IntoIterator<Item = StoredFile>) {
        for file in files {
            if let Err(err) = self.store.remove(&file) {
                warn!(error = %err, path = %file.path, "unable to remove superseded document file");
            }
        }
    }
}
