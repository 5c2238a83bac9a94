pub mod browser;
pub mod capture;
pub mod config;
pub mod element;
pub mod error;
pub mod page;

pub use browser::HeadlessBrowser;
pub use capture::{CaptureRunner, CdpDriver, PageDriver};
pub use config::BrowserConfig;
pub use error::{Error, Result};
pub use page::Page;
