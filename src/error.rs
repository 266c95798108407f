use std::path::PathBuf;

/// Startup/configuration failures. All of these are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("could not retrieve token {name}; ensure it is defined in {path}")]
    MissingSecret { name: &'static str, path: PathBuf },

    #[error("URL is not a github.com repo: {0}")]
    NotGithub(String),

    #[error("invalid GitHub repository URL: {0}")]
    InvalidRepoUrl(String),

    #[error("invalid URL, must start with http(s)://: {0}")]
    InvalidWebUrl(String),
}
