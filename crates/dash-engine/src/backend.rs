//! Analytical backend collaborator
//!
//! Handlers reach external systems only through [`Backend`], always via
//! `HandlerContext::call` so the call can race cancellation.
//! [`InMemoryBackend`] serves tests and offline replay.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::Notify;

use dash_core::ObjRef;

/// Collaborator failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend object not found: {0}")]
    NotFound(String),

    #[error("backend rejected request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFormMetadata {
    #[serde(rename = "ref")]
    pub obj_ref: ObjRef,
    pub attribute: ObjRef,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDateDataset {
    pub data_set: ObjRef,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Pdf,
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Xlsx => write!(f, "xlsx"),
            Self::Pdf => write!(f, "pdf"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResult {
    pub uri: String,
}

/// Narrow async contract with the analytical backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// Metadata for the known display forms among `refs`; unknown refs are omitted
    async fn resolve_display_forms(
        &self,
        refs: &[ObjRef],
    ) -> Result<Vec<DisplayFormMetadata>, BackendError>;

    /// Date data sets available to the dashboard
    async fn catalog_date_datasets(&self) -> Result<Vec<CatalogDateDataset>, BackendError>;

    async fn export_insight(
        &self,
        insight: &ObjRef,
        format: ExportFormat,
    ) -> Result<ExportResult, BackendError>;
}

/// Backend operation names, used for failure injection and call logs
pub mod ops {
    pub const RESOLVE_DISPLAY_FORMS: &str = "resolveDisplayForms";
    pub const CATALOG_DATE_DATASETS: &str = "catalogDateDatasets";
    pub const EXPORT_INSIGHT: &str = "exportInsight";
}

/// In-memory backend with failure injection and an export gate
pub struct InMemoryBackend {
    display_forms: HashMap<ObjRef, DisplayFormMetadata>,
    date_datasets: Vec<CatalogDateDataset>,
    failures: HashMap<&'static str, BackendError>,
    export_gate: Option<Arc<Notify>>,
    export_started: Arc<Notify>,
    calls: Mutex<Vec<String>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            display_forms: HashMap::new(),
            date_datasets: Vec::new(),
            failures: HashMap::new(),
            export_gate: None,
            export_started: Arc::new(Notify::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_display_form(mut self, display_form: ObjRef, attribute: ObjRef, title: &str) -> Self {
        self.display_forms.insert(
            display_form.clone(),
            DisplayFormMetadata {
                obj_ref: display_form,
                attribute,
                title: title.to_string(),
            },
        );
        self
    }

    pub fn with_date_dataset(mut self, data_set: ObjRef, title: &str) -> Self {
        self.date_datasets.push(CatalogDateDataset {
            data_set,
            title: title.to_string(),
        });
        self
    }

    /// Make operation `op` (see [`ops`]) fail with `error`
    pub fn with_failure(mut self, op: &'static str, error: BackendError) -> Self {
        self.failures.insert(op, error);
        self
    }

    /// Hold exports until `gate` is notified
    pub fn with_export_gate(mut self, gate: Arc<Notify>) -> Self {
        self.export_gate = Some(gate);
        self
    }

    /// Notified each time an export starts
    pub fn export_started(&self) -> Arc<Notify> {
        Arc::clone(&self.export_started)
    }

    /// Operations invoked so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn enter(&self, op: &'static str) -> Result<(), BackendError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(op.to_string());
        match self.failures.get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn resolve_display_forms(
        &self,
        refs: &[ObjRef],
    ) -> Result<Vec<DisplayFormMetadata>, BackendError> {
        self.enter(ops::RESOLVE_DISPLAY_FORMS)?;
        Ok(refs
            .iter()
            .filter_map(|r| self.display_forms.get(r).cloned())
            .collect())
    }

    async fn catalog_date_datasets(&self) -> Result<Vec<CatalogDateDataset>, BackendError> {
        self.enter(ops::CATALOG_DATE_DATASETS)?;
        Ok(self.date_datasets.clone())
    }

    async fn export_insight(
        &self,
        insight: &ObjRef,
        format: ExportFormat,
    ) -> Result<ExportResult, BackendError> {
        self.export_started.notify_one();
        self.enter(ops::EXPORT_INSIGHT)?;
        if let Some(gate) = &self.export_gate {
            gate.notified().await;
        }
        Ok(ExportResult {
            uri: format!("memory://exports/{}.{}", insight, format),
        })
    }
}
