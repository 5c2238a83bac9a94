use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};
use url::Url;

use crate::browser::HeadlessBrowser;
use crate::config::BrowserConfig;
use crate::error::{Error, Result};
use crate::page::Page;

/// The HTML document to capture, looked up in the runner's working directory.
const TARGET_DOCUMENT: &str = "index.html";

/// CSS selector for the element whose activation is being verified.
const TRIGGER_SELECTOR: &str = "#scrollWrapper";

/// Output path for the pre-interaction capture.
const INITIAL_SHOT: &str = "screenshot_initial.png";

/// Output path for the post-interaction capture.
const OPEN_SHOT: &str = "screenshot_open.png";

/// Blind wait for the CSS transition after the click. The page exposes no
/// completion signal, so this is a guess and a known source of flakiness.
const TRANSITION_WAIT: Duration = Duration::from_millis(2000);

/// The capability surface the capture flow consumes. One implementation is
/// backed by CDP; tests substitute a scripted one.
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    /// Load a URL, suspending until the page reaches its loaded state.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Locate an element by CSS selector and click it. Errors if absent.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Write a full-page PNG capture to `path`, overwriting any existing file.
    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Cooperative sleep.
    async fn wait(&self, duration: Duration);

    /// Release the browser session.
    async fn close(self) -> Result<()>;
}

/// chromiumoxide-backed driver: one headless browser, one page.
#[derive(Debug)]
pub struct CdpDriver {
    browser: HeadlessBrowser,
    page: Page,
}

impl CdpDriver {
    /// Launch a headless browser and open a blank page for the run.
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let browser = HeadlessBrowser::launch(config).await?;
        Self::with_page(browser, "about:blank").await
    }

    async fn with_page(browser: HeadlessBrowser, url: &str) -> Result<Self> {
        match browser.new_page(url).await {
            Ok(page) => Ok(Self { browser, page }),
            Err(e) => {
                // The session must not outlive a failed setup.
                let _ = browser.close().await;
                Err(e)
            }
        }
    }
}

impl PageDriver for CdpDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page.goto(url).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page.click(selector).await
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.page.save_screenshot(path).await
    }

    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn close(self) -> Result<()> {
        self.browser.close().await
    }
}

/// Captures a before/after-interaction screenshot pair of `index.html` in its
/// working directory: navigate, capture, click `#scrollWrapper`, wait for the
/// transition, capture again.
pub struct CaptureRunner {
    dir: PathBuf,
}

impl CaptureRunner {
    /// Bind the runner to the current working directory.
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: std::env::current_dir()?,
        })
    }

    /// Bind the runner to an explicit working directory. The directory must
    /// be an absolute path.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Launch a headless browser and perform the capture sequence.
    pub async fn run(&self) -> Result<()> {
        let driver = CdpDriver::launch(BrowserConfig::default()).await?;
        self.run_with(driver).await
    }

    /// Perform the capture sequence against the given driver. The driver is
    /// closed on both the success and the failure path; if both the capture
    /// and the close fail, the capture error wins.
    pub async fn run_with<D: PageDriver>(&self, driver: D) -> Result<()> {
        let outcome = self.capture(&driver).await;
        let closed = driver.close().await;
        outcome?;
        closed
    }

    async fn capture<D: PageDriver>(&self, driver: &D) -> Result<()> {
        let url = self.target_url()?;
        debug!(%url, "navigating");
        driver.navigate(&url).await?;

        driver.screenshot(&self.dir.join(INITIAL_SHOT)).await?;
        info!("Initial screenshot taken.");

        driver.click(TRIGGER_SELECTOR).await?;
        driver.wait(TRANSITION_WAIT).await;

        driver.screenshot(&self.dir.join(OPEN_SHOT)).await?;
        info!("Open state screenshot taken.");

        Ok(())
    }

    /// Resolve the target document into a `file://` URL. Pure path work: the
    /// document is not required to exist at this point.
    fn target_url(&self) -> Result<String> {
        let path = self.dir.join(TARGET_DOCUMENT);
        let url = Url::from_file_path(&path).map_err(|_| {
            Error::Navigation(format!(
                "cannot build a file URL from {}",
                path.display()
            ))
        })?;
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Navigate(String),
        Click(String),
        Screenshot(PathBuf),
        Wait(Duration),
        Close,
    }

    /// Records every driver call; individual steps can be scripted to fail.
    struct ScriptedDriver {
        calls: Arc<Mutex<Vec<Call>>>,
        fail_navigate: bool,
        fail_click: bool,
    }

    impl ScriptedDriver {
        fn new() -> (Self, Arc<Mutex<Vec<Call>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let driver = Self {
                calls: Arc::clone(&calls),
                fail_navigate: false,
                fail_click: false,
            };
            (driver, calls)
        }

        fn log(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl PageDriver for ScriptedDriver {
        async fn navigate(&self, url: &str) -> Result<()> {
            self.log(Call::Navigate(url.to_string()));
            if self.fail_navigate {
                return Err(Error::Navigation("net::ERR_FILE_NOT_FOUND".into()));
            }
            Ok(())
        }

        async fn click(&self, selector: &str) -> Result<()> {
            self.log(Call::Click(selector.to_string()));
            if self.fail_click {
                return Err(Error::ElementNotFound(selector.to_string()));
            }
            Ok(())
        }

        async fn screenshot(&self, path: &Path) -> Result<()> {
            self.log(Call::Screenshot(path.to_path_buf()));
            Ok(())
        }

        async fn wait(&self, duration: Duration) {
            self.log(Call::Wait(duration));
        }

        async fn close(self) -> Result<()> {
            self.log(Call::Close);
            Ok(())
        }
    }

    #[tokio::test]
    async fn run_performs_steps_in_order() {
        let (driver, calls) = ScriptedDriver::new();
        let runner = CaptureRunner::in_dir("/work");

        runner.run_with(driver).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                Call::Navigate("file:///work/index.html".into()),
                Call::Screenshot("/work/screenshot_initial.png".into()),
                Call::Click("#scrollWrapper".into()),
                Call::Wait(Duration::from_millis(2000)),
                Call::Screenshot("/work/screenshot_open.png".into()),
                Call::Close,
            ]
        );
    }

    #[tokio::test]
    async fn click_failure_skips_second_capture_but_closes() {
        let (mut driver, calls) = ScriptedDriver::new();
        driver.fail_click = true;
        let runner = CaptureRunner::in_dir("/work");

        let err = runner.run_with(driver).await.unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(_)));

        let calls = calls.lock().unwrap();
        let shots = calls
            .iter()
            .filter(|c| matches!(c, Call::Screenshot(_)))
            .count();
        assert_eq!(shots, 1, "only the initial capture should have run");
        assert_eq!(calls.last(), Some(&Call::Close));
    }

    #[tokio::test]
    async fn navigate_failure_takes_no_screenshots() {
        let (mut driver, calls) = ScriptedDriver::new();
        driver.fail_navigate = true;
        let runner = CaptureRunner::in_dir("/work");

        let err = runner.run_with(driver).await.unwrap_err();
        assert!(matches!(err, Error::Navigation(_)));

        let calls = calls.lock().unwrap();
        assert!(!calls.iter().any(|c| matches!(c, Call::Screenshot(_))));
        assert_eq!(calls.last(), Some(&Call::Close));
    }

    #[tokio::test]
    #[ignore = "requires a local Chrome/Chromium install"]
    async fn failed_page_open_still_releases_the_browser() {
        let browser = HeadlessBrowser::launch(BrowserConfig::default())
            .await
            .expect("launch browser");

        // An unreachable origin makes the page open fail; the driver must
        // shut the browser down before reporting it.
        let err = CdpDriver::with_page(browser, "http://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Navigation(_)), "got: {err}");
    }

    #[test]
    fn target_url_is_built_without_touching_the_filesystem() {
        let runner = CaptureRunner::in_dir("/no/such/dir");
        assert_eq!(runner.target_url().unwrap(), "file:///no/such/dir/index.html");
    }

    #[test]
    fn target_url_rejects_a_relative_directory() {
        let runner = CaptureRunner::in_dir("relative/dir");
        assert!(matches!(
            runner.target_url(),
            Err(Error::Navigation(_))
        ));
    }
}
