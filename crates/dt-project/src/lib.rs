//! dt-project: run configuration, source table and model documents.

pub mod config;
pub mod models;
pub mod source;
pub mod validate;

pub use config::*;
pub use models::load_models;
pub use source::{JsonTableSource, TabularSource};
pub use validate::{ValidationError, validate_config, validate_setup};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid model document {path}: {source}")]
    Model {
        path: std::path::PathBuf,
        #[source]
        source: dt_core::DtError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProjectError {
    pub(crate) fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub fn load_config(path: &std::path::Path) -> ProjectResult<RunConfig> {
    let content = std::fs::read_to_string(path).map_err(ProjectError::io(path))?;
    let mut config: RunConfig = serde_yaml::from_str(&content)?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    validate_config(&config)?;
    Ok(config)
}

pub fn save_config(path: &std::path::Path, config: &RunConfig) -> ProjectResult<()> {
    validate_config(config)?;
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content).map_err(ProjectError::io(path))?;
    Ok(())
}
