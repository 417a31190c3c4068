use thiserror::Error;

pub type AclResult<T> = Result<T, AclError>;

#[derive(Error, Debug)]
pub enum AclError {
    #[error("io error reading {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("failed to parse talkgroup rules file {path}: {source}")]
    Yaml { path: String, #[source] source: serde_yaml::Error },
}
