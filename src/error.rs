use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShooterError {
    #[error("render failed after {attempts} attempts")]
    RenderFailed { attempts: usize },

    #[error("remote store reported name `{actual}`, expected `{expected}`")]
    UploadMismatch { expected: String, actual: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("remote store error: {0}")]
    Remote(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ShooterError {
    pub fn is_render_failure(&self) -> bool {
        matches!(self, ShooterError::RenderFailed { .. })
    }
}
