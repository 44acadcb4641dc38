//! The template catalog, loaded from TOML.
//!
//! `TemplateCatalog` keeps templates in declaration order and answers the
//! questions the CRM asks of it: which templates exist, how each one fares
//! against a deal, and which ones may be offered ("Use Template" enabled).

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dealflow_contracts::{
    deal::Deal,
    error::{DealflowError, DealflowResult},
    evaluation::EvaluationReport,
    template::{Template, TemplateType},
};

use crate::evaluate::evaluate;

/// The catalog that ships with the runtime.
const BUILTIN_CATALOG: &str = include_str!("../templates/catalog.toml");

/// Top-level structure of a catalog file.
///
/// ```toml
/// [[templates]]
/// id = "weekly-pipeline-review"
/// name = "Weekly Pipeline Review"
/// type = "date"
/// trigger = "weekly-review"
///
/// [[templates.steps]]
/// id = "weekly-task"
/// type = "task"
/// name = "Weekly review"
/// taskTitle = "Review status of {deal}"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateCatalog {
    #[serde(default)]
    templates: Vec<Template>,
}

impl TemplateCatalog {
    /// Parse `s` as a TOML catalog.
    ///
    /// Returns `DealflowError::ConfigError` if the TOML is malformed, does not
    /// match the catalog schema, or declares the same template id twice.
    pub fn from_toml_str(s: &str) -> DealflowResult<Self> {
        let catalog: TemplateCatalog = toml::from_str(s).map_err(|e| DealflowError::ConfigError {
            reason: format!("failed to parse template catalog TOML: {}", e),
        })?;
        catalog.check_unique_ids()?;

        debug!(templates = catalog.templates.len(), "template catalog loaded");
        Ok(catalog)
    }

    /// Read the file at `path` and parse it as a catalog.
    pub fn from_file(path: &Path) -> DealflowResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| DealflowError::ConfigError {
            reason: format!("failed to read template catalog '{}': {}", path.display(), e),
        })?;
        let catalog = Self::from_toml_str(&contents)?;
        info!(path = %path.display(), templates = catalog.len(), "template catalog loaded from file");
        Ok(catalog)
    }

    /// The catalog embedded in this crate.
    pub fn builtin() -> DealflowResult<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Build a catalog from templates already in memory.
    pub fn from_templates(templates: Vec<Template>) -> DealflowResult<Self> {
        let catalog = Self { templates };
        catalog.check_unique_ids()?;
        Ok(catalog)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Templates of the given type, in catalog order.
    pub fn filter_by_type(&self, kind: TemplateType) -> impl Iterator<Item = &Template> {
        self.templates.iter().filter(move |t| t.kind == kind)
    }

    /// Evaluate every template against `deal`, in catalog order.
    pub fn evaluate_all<'a>(&'a self, deal: &Deal) -> Vec<(&'a Template, EvaluationReport)> {
        self.templates.iter().map(|t| (t, evaluate(t, deal))).collect()
    }

    /// Templates whose condition and trigger are both valid for `deal`.
    pub fn eligible<'a>(&'a self, deal: &Deal) -> Vec<&'a Template> {
        self.evaluate_all(deal)
            .into_iter()
            .filter(|(_, report)| report.is_eligible())
            .map(|(t, _)| t)
            .collect()
    }

    fn check_unique_ids(&self) -> DealflowResult<()> {
        let mut seen = HashSet::new();
        for template in &self.templates {
            if !seen.insert(template.id.as_str()) {
                return Err(DealflowError::ConfigError {
                    reason: format!("duplicate template id '{}' in catalog", template.id),
                });
            }
        }
        Ok(())
    }
}
