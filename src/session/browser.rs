//! Interactive login through a headless browser
//!
//! Navigating to the protected viewer path redirects to Keycloak's hosted
//! login form; this module drives that form and then collects the OAuth2
//! Proxy session cookies from the browser context. One attempt per call;
//! retry policy, if any, belongs to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::{Browser, Tab};

use super::Credential;
use crate::config::{AccountConfig, HarnessConfig};
use crate::error::{HarnessError, Result};

/// Keycloak login form selectors
mod selectors {
    pub const LOGIN_FORM: &str = "#kc-form-login";
    pub const USERNAME_INPUT: &str = "#username";
    pub const PASSWORD_INPUT: &str = "#password";
    pub const SIGN_IN_BUTTON: &str = "#kc-login";
    /// Places Keycloak renders an in-page rejection ("Invalid username or
    /// password."), checked after a failed wait for the authenticated URL
    pub const ERROR_TEXT: [&str; 2] = ["#input-error", ".kc-feedback-text"];
}

/// The narrow interface the harness needs from a browser runtime
///
/// Everything session acquisition does with a page goes through these seven
/// operations, so tests can script the whole login without a browser.
#[cfg_attr(test, mockall::automock)]
pub trait LoginDriver {
    /// Navigate the page to `url`
    fn navigate(&self, url: &str) -> Result<()>;

    /// Block until `selector` is present (polling wait, not a fixed sleep)
    fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Fill the element at `selector` with `value`
    fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Click the element at `selector`
    fn click(&self, selector: &str) -> Result<()>;

    /// Block until the page URL contains `fragment`, bounded by `timeout`
    fn wait_for_url(&self, fragment: &str, timeout: Duration) -> Result<()>;

    /// Visible text of the element at `selector`, if present
    fn visible_text(&self, selector: &str) -> Option<String>;

    /// All cookies of the page's context as (name, value) pairs
    fn cookies(&self) -> Result<Vec<(String, String)>>;
}

/// Parameters for one login attempt
#[derive(Debug, Clone)]
pub struct LoginRequest {
    /// Protected entry point; navigating here triggers the IdP redirect
    pub entry_url: String,
    /// Path fragment of the authenticated application URL (e.g. "/ohif-viewer")
    pub authenticated_fragment: String,
    /// Substring identifying the session-proxy cookie
    pub session_cookie_fragment: String,
    /// Bound on form readiness and post-submit navigation waits
    pub timeout: Duration,
}

impl LoginRequest {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            entry_url: config.target.viewer_url(),
            authenticated_fragment: config.target.viewer_path.clone(),
            session_cookie_fragment: config.auth.session_cookie_fragment.clone(),
            timeout: config.auth.login_timeout(),
        }
    }
}

/// Drive one interactive login and mint a credential
///
/// # Steps
/// 1. Navigate to the protected entry point
/// 2. Wait for the Keycloak form (username input is the readiness signal)
/// 3. Fill both fields, click sign-in
/// 4. Wait for the URL to settle on the authenticated path, bounded by the
///    configured timeout
/// 5. Read all cookies and serialize them as one header value
///
/// If step 4 fails, the page is probed for Keycloak's in-page error text so
/// rejected credentials fail with a precise message instead of only a
/// timeout. A provider that is simply unreachable still surfaces as the
/// timeout; the harness cannot tell those apart from the page alone.
pub fn acquire_credential(
    driver: &dyn LoginDriver,
    request: &LoginRequest,
    account: &AccountConfig,
) -> Result<Credential> {
    if account.username.is_empty() || account.password.is_empty() {
        return Err(HarnessError::Authentication(
            "username and password must be non-empty".to_string(),
        ));
    }

    tracing::info!(url = %request.entry_url, user = %account.username, "starting interactive login");

    driver.navigate(&request.entry_url)?;
    driver.wait_for_element(selectors::USERNAME_INPUT, request.timeout)?;
    driver.fill(selectors::USERNAME_INPUT, &account.username)?;
    driver.fill(selectors::PASSWORD_INPUT, &account.password)?;
    driver.click(selectors::SIGN_IN_BUTTON)?;

    if let Err(wait_error) =
        driver.wait_for_url(&request.authenticated_fragment, request.timeout)
    {
        for selector in selectors::ERROR_TEXT {
            if let Some(text) = driver.visible_text(selector) {
                let text = text.trim();
                if !text.is_empty() {
                    return Err(HarnessError::Authentication(format!(
                        "identity provider rejected credentials: {text}"
                    )));
                }
            }
        }
        return Err(match wait_error {
            already @ HarnessError::Authentication(_) => already,
            other => HarnessError::Authentication(format!(
                "never reached authenticated URL: {other}"
            )),
        });
    }

    let cookies = driver.cookies()?;
    tracing::debug!(cookie_count = cookies.len(), "login reached authenticated URL");
    Credential::from_cookie_pairs(&cookies, &request.session_cookie_fragment)
}

/// Launch a fresh headless Chrome context, log in as `account`, and return
/// the credential. The browser work is blocking, so it runs on the tokio
/// blocking pool; the context is dropped when the login completes.
pub async fn acquire_with_headless_chrome(
    config: &HarnessConfig,
    account: &AccountConfig,
) -> Result<Credential> {
    let request = LoginRequest::from_config(config);
    let account = account.clone();

    tokio::task::spawn_blocking(move || {
        let driver = HeadlessChromeDriver::launch()?;
        acquire_credential(&driver, &request, &account)
    })
    .await
    .map_err(|join_error| HarnessError::Browser(join_error.to_string()))?
}

/// `LoginDriver` over a headless Chrome tab
pub struct HeadlessChromeDriver {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl HeadlessChromeDriver {
    /// Launch a browser with default options and open a fresh tab
    pub fn launch() -> Result<Self> {
        let browser = Browser::default().map_err(browser_error)?;
        let tab = browser.new_tab().map_err(browser_error)?;
        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

fn browser_error(error: anyhow::Error) -> HarnessError {
    HarnessError::Browser(error.to_string())
}

impl LoginDriver for HeadlessChromeDriver {
    fn navigate(&self, url: &str) -> Result<()> {
        self.tab.navigate_to(url).map_err(browser_error)?;
        Ok(())
    }

    fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(browser_error)?;
        Ok(())
    }

    fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.tab
            .find_element(selector)
            .map_err(browser_error)?
            .type_into(value)
            .map_err(browser_error)?;
        Ok(())
    }

    fn click(&self, selector: &str) -> Result<()> {
        self.tab
            .find_element(selector)
            .map_err(browser_error)?
            .click()
            .map_err(browser_error)?;
        Ok(())
    }

    fn wait_for_url(&self, fragment: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.tab.get_url().contains(fragment) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HarnessError::Authentication(format!(
                    "timed out after {timeout:?} waiting for URL containing {fragment:?}"
                )));
            }
            std::thread::sleep(Duration::from_millis(250));
        }
    }

    fn visible_text(&self, selector: &str) -> Option<String> {
        self.tab
            .find_element(selector)
            .ok()
            .and_then(|element| element.get_inner_text().ok())
    }

    fn cookies(&self) -> Result<Vec<(String, String)>> {
        let cookies = self.tab.get_cookies().map_err(browser_error)?;
        Ok(cookies
            .into_iter()
            .map(|cookie| (cookie.name, cookie.value))
            .collect())
    }
}
