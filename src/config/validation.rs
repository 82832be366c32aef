use super::models::Config;
use crate::versioner::VersionerRegistry;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("folder.path is not set")]
    MissingFolderPath,

    #[error("Unknown versioning type '{kind}' (available: {available})")]
    UnknownVersioner { kind: String, available: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_folder(config)?;
    validate_versioning(config)?;
    Ok(())
}

fn validate_folder(config: &Config) -> Result<(), ValidationError> {
    if config.folder.path.as_os_str().is_empty() {
        return Err(ValidationError::MissingFolderPath);
    }
    Ok(())
}

/// The versioning type must name a registered versioner. Parameters are left
/// to the versioner itself, which falls back to safe defaults.
fn validate_versioning(config: &Config) -> Result<(), ValidationError> {
    let registry = VersionerRegistry::with_defaults();
    if !registry.has_versioner(&config.versioning.kind) {
        return Err(ValidationError::UnknownVersioner {
            kind: config.versioning.kind.clone(),
            available: registry.names().collect::<Vec<_>>().join(", "),
        });
    }
    Ok(())
}
