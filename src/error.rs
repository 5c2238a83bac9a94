use thiserror::Error;

/// Failures surfaced by the capture flow and the browser layer under it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not launch headless browser: {0}")]
    Launch(String),

    #[error("could not load page: {0}")]
    Navigation(String),

    #[error("no element matches {0}")]
    ElementNotFound(String),

    #[error("gave up waiting for {0}")]
    Timeout(String),

    #[error("script evaluation failed: {0}")]
    Js(String),

    #[error("could not capture screenshot: {0}")]
    Screenshot(String),

    #[error("browser protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
