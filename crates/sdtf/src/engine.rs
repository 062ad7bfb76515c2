//! Engine facade: one tree state plus saved queries ("views").

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Result, SdtfError};
use crate::options::AnalyzerOptions;
use crate::query::{QueryResult, SdtfQuery};
use crate::state::TreeState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewExport {
    pub name: String,
    pub query: SdtfQuery,
}

/// Everything needed to rebuild an equivalent engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineExport {
    pub token_tree: Value,
    pub views: Vec<ViewExport>,
    pub active_view_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SdtfEngine {
    state: TreeState,
    views: IndexMap<String, SdtfQuery>,
    active_view: Option<String>,
}

impl SdtfEngine {
    pub fn new(raw: &Value, options: &AnalyzerOptions) -> Result<Self> {
        Ok(Self::from_state(TreeState::new(raw, options)?))
    }

    pub fn from_state(state: TreeState) -> Self {
        Self {
            state,
            views: IndexMap::new(),
            active_view: None,
        }
    }

    pub fn state(&self) -> &TreeState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut TreeState {
        &mut self.state
    }

    /// Saves `query` under `name` after checking it runs.
    pub fn register_view(&mut self, name: &str, query: SdtfQuery) -> Result<()> {
        if self.views.contains_key(name) {
            return Err(SdtfError::DuplicateView(name.to_string()));
        }
        let matched = self.state.query(&query)?.len();
        debug!(view = name, matched, "registered view");
        self.views.insert(name.to_string(), query);
        Ok(())
    }

    pub fn update_query(&mut self, name: &str, query: SdtfQuery) -> Result<()> {
        if !self.views.contains_key(name) {
            return Err(SdtfError::ViewNotFound(name.to_string()));
        }
        let matched = self.state.query(&query)?.len();
        debug!(view = name, matched, "updated view query");
        self.views.insert(name.to_string(), query);
        Ok(())
    }

    /// Deletes a view; the active view is cleared if it was this one.
    pub fn delete_view(&mut self, name: &str) -> Result<()> {
        if self.views.shift_remove(name).is_none() {
            return Err(SdtfError::ViewNotFound(name.to_string()));
        }
        if self.active_view.as_deref() == Some(name) {
            self.active_view = None;
        }
        Ok(())
    }

    pub fn set_active_view(&mut self, name: Option<&str>) -> Result<()> {
        match name {
            Some(name) if !self.views.contains_key(name) => {
                Err(SdtfError::ViewNotFound(name.to_string()))
            }
            _ => {
                self.active_view = name.map(str::to_string);
                Ok(())
            }
        }
    }

    pub fn active_view(&self) -> Option<(&str, &SdtfQuery)> {
        let name = self.active_view.as_deref()?;
        self.views.get(name).map(|query| (name, query))
    }

    pub fn views(&self) -> impl Iterator<Item = (&str, &SdtfQuery)> {
        self.views.iter().map(|(name, query)| (name.as_str(), query))
    }

    /// Re-runs a saved query against the current tree.
    pub fn run_view(&self, name: &str) -> Result<QueryResult<'_>> {
        let query = self
            .views
            .get(name)
            .ok_or_else(|| SdtfError::ViewNotFound(name.to_string()))?;
        trace!(view = name, "running view");
        self.state.query(query)
    }

    pub fn export(&self) -> EngineExport {
        EngineExport {
            token_tree: self.state.to_json(),
            views: self
                .views
                .iter()
                .map(|(name, query)| ViewExport {
                    name: name.clone(),
                    query: query.clone(),
                })
                .collect(),
            active_view_name: self.active_view.clone(),
        }
    }

    /// Rebuilds an engine by analyzing the exported tree again.
    pub fn import(export: &EngineExport, options: &AnalyzerOptions) -> Result<Self> {
        let mut engine = Self::new(&export.token_tree, options)?;
        for view in &export.views {
            engine.register_view(&view.name, view.query.clone())?;
        }
        engine.set_active_view(export.active_view_name.as_deref())?;
        Ok(engine)
    }

    /// An independent copy; edits to either side never reach the other.
    pub fn fork(&self) -> Self {
        self.clone()
    }
}
