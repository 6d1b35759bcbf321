use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::dataset::Dataset;
use crate::{EngineError, EngineResult};

/// Datasets served by one process, keyed by name.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    datasets: HashMap<String, Arc<Dataset>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `dataset` under its own name. Names must be unique.
    pub fn insert(&mut self, dataset: Dataset) -> EngineResult<Arc<Dataset>> {
        let name = dataset.name().to_string();
        if self.datasets.contains_key(&name) {
            return Err(EngineError::InvalidDataset {
                name,
                reason: "a dataset with this name is already registered".into(),
            });
        }
        let dataset = Arc::new(dataset);
        self.datasets.insert(name.clone(), dataset.clone());
        info!(dataset = %name, total = self.datasets.len(), "dataset registered");
        Ok(dataset)
    }

    pub fn get(&self, name: &str) -> EngineResult<Arc<Dataset>> {
        self.datasets
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownDataset(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.datasets.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}
