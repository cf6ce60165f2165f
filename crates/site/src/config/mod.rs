//! Layered configuration.
//!
//! Every config file the worker writes is the shallow merge of a fixed
//! sequence of layers. A layer that cannot be read degrades to an empty one;
//! only failing to write the merged result is an error.

mod defaults;
mod space;

pub use defaults::{default_generator_config, installation_config_path};
pub use space::{site_layer, space_layer};

use serde_yaml::{Mapping, Value};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Result, SiteError};

/// Where a layer comes from, in ascending precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerSource {
    /// Built into the worker
    Default,
    /// Shipped with the generator installation
    Generator,
    /// Site template
    Template,
    /// Already present in the workspace
    Workspace,
    /// Derived from the task descriptor
    Task,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayer {
    pub source: LayerSource,
    pub values: Mapping,
}

impl ConfigLayer {
    pub fn new(source: LayerSource, values: Mapping) -> Self {
        Self { source, values }
    }

    pub fn empty(source: LayerSource) -> Self {
        Self::new(source, Mapping::new())
    }

    /// Read a YAML mapping from `path`.
    ///
    /// Missing, unreadable or malformed files produce an empty layer.
    pub async fn from_file(source: LayerSource, path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), ?source, "Config layer absent");
            return Self::empty(source);
        }

        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config layer, using empty layer");
                return Self::empty(source);
            }
        };

        match serde_yaml::from_str::<Value>(&content) {
            Ok(Value::Mapping(values)) => Self::new(source, values),
            Ok(Value::Null) => Self::empty(source),
            Ok(_) => {
                warn!(path = %path.display(), "Config layer is not a mapping, using empty layer");
                Self::empty(source)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse config layer, using empty layer");
                Self::empty(source)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Shallow-merge layers; for every top-level key the highest-precedence layer
/// wins.
///
/// Layers are applied in [`LayerSource`] order regardless of the order they
/// are passed in, so precedence cannot be broken by a caller.
pub fn merge(layers: &[ConfigLayer]) -> Mapping {
    let mut ordered: Vec<&ConfigLayer> = layers.iter().collect();
    ordered.sort_by_key(|layer| layer.source);

    let mut merged = Mapping::new();
    for layer in ordered {
        for (key, value) in &layer.values {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Persist a merged config as YAML.
pub async fn write_config(path: &Path, values: &Mapping) -> Result<()> {
    let content =
        serde_yaml::to_string(values).map_err(|e| SiteError::config_write(path, e))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| SiteError::config_write(path, e))?;
    }

    // Never write through a link left behind by another task
    if fs::symlink_metadata(path)
        .await
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
    {
        fs::remove_file(path)
            .await
            .map_err(|e| SiteError::config_write(path, e))?;
    }

    fs::write(path, content)
        .await
        .map_err(|e| SiteError::config_write(path, e))?;

    debug!(path = %path.display(), keys = values.len(), "Config written");
    Ok(())
}

/// Build a mapping from string keys, skipping `None` values.
pub(crate) fn mapping_of<I>(entries: I) -> Mapping
where
    I: IntoIterator<Item = (&'static str, Option<Value>)>,
{
    entries
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (Value::from(key), v)))
        .collect()
}
