//! HTTP client for vim.org: login, page fetches and form posts.
//!
//! Redirects are never followed automatically. Every form on the site answers
//! success with a `302`, and the session cookie arrives on the login redirect,
//! so the client inspects each response itself and keeps the
//! [`SessionContext`] in step with what a browser would send.

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use tracing::{debug, error, info};

use crate::contract::{AccountInfo, NewScript, NewVersion, ScriptDetails, ScriptSite};
use crate::error::{Result, VishopError};
use crate::scrape;
use crate::session::{self, Credentials, SessionContext};

pub const DEFAULT_BASE_URL: &str = "https://www.vim.org";
/// Upload size limit the site's forms declare.
pub const MAX_FILE_SIZE: &str = "10485760";

pub struct VimOrgClient {
    http: reqwest::Client,
    base_url: reqwest::Url,
    session: SessionContext,
}

impl VimOrgClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_session(base_url, SessionContext::default())
    }

    pub fn with_session(base_url: &str, session: SessionContext) -> Result<Self> {
        let base_url = reqwest::Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| VishopError::Config(format!("invalid base url '{base_url}': {e}")))?;
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        info!(base_url = %base_url, "Initialised vim.org client");
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Absolute URL for a site path such as `scripts/script.php?script_id=1`.
    pub fn url(&self, path: &str) -> Result<String> {
        let base = format!("{}/", self.base_url.as_str().trim_end_matches('/'));
        let joined = reqwest::Url::parse(&base)
            .and_then(|b| b.join(path))
            .map_err(|e| VishopError::Config(format!("invalid url for '{path}': {e}")))?;
        Ok(joined.to_string())
    }

    fn location(&self, response: &Response) -> Result<String> {
        let raw = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                VishopError::UnexpectedResponse(format!(
                    "redirect from {} without a Location header",
                    response.url()
                ))
            })?;
        self.url(raw)
    }

    /// GET a page that must answer `200`, then move the referer to it.
    async fn get_page(&mut self, url: &str) -> Result<String> {
        debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .headers(self.session.headers())
            .send()
            .await?;
        self.session.absorb_response_headers(response.headers());
        let status = response.status();
        let body = response.text().await?;
        self.session.navigate(url);
        if status != StatusCode::OK {
            error!(url, status = status.as_u16(), "Page fetch failed");
            return Err(VishopError::UnexpectedResponse(format!(
                "GET {url} returned status {status}"
            )));
        }
        Ok(body)
    }

    /// Log in with `credentials`, leaving the session cookie in the context.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        info!(username = %credentials.username, "Attempting login");
        let url = self.url("login.php")?;
        self.session.navigate(&url);

        let form = [
            ("authenticate", "true"),
            ("referrer", ""),
            ("userName", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let response = self
            .http
            .post(&url)
            .headers(self.session.headers())
            .form(&form)
            .send()
            .await?;
        self.session.absorb_response_headers(response.headers());
        let status = response.status();
        debug!(status = status.as_u16(), "Login form answered");

        if !status.is_redirection() {
            let body = response.text().await?;
            debug!(body = %body, "Login response body");
            return session::check_login_response(status.as_u16(), &body);
        }

        let landing = self.location(&response)?;
        let body = self.get_page(&landing).await?;
        session::check_login_landing(&body)?;
        info!("Login succeeded");
        Ok(())
    }

    /// POST a form and return the redirect target. Anything but `302` becomes `on_failure(status)`.
    async fn post_expecting_redirect(
        &mut self,
        url: &str,
        request: reqwest::RequestBuilder,
        on_failure: fn(u16) -> VishopError,
    ) -> Result<String> {
        let response = request.headers(self.session.headers()).send().await?;
        self.session.absorb_response_headers(response.headers());
        let status = response.status();
        debug!(url, status = status.as_u16(), "Form answered");
        if status != StatusCode::FOUND {
            let body = response.text().await.unwrap_or_default();
            error!(url, status = status.as_u16(), "Form submission was not accepted");
            debug!(body = %body, "Rejected form response body");
            return Err(on_failure(status.as_u16()));
        }
        let location = self.location(&response)?;
        self.session.navigate(&location);
        Ok(location)
    }

    async fn archive_part(path: &std::path::Path) -> Result<Part> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle".to_string());
        Ok(Part::bytes(bytes).file_name(file_name))
    }
}

#[async_trait]
impl ScriptSite for VimOrgClient {
    async fn fetch_account(&mut self) -> Result<AccountInfo> {
        let url = self.url("account/index.php")?;
        let body = self.get_page(&url).await?;
        let account = scrape::parse_account(&body)?;
        info!(
            user_name = %account.user_name,
            scripts = account.scripts.len(),
            "Fetched account information"
        );
        Ok(account)
    }

    async fn fetch_versions(&mut self, script_id: &str) -> Result<Vec<String>> {
        let url = self.url(&format!("scripts/script.php?script_id={script_id}"))?;
        let body = self.get_page(&url).await?;
        scrape::parse_versions(&body)
    }

    async fn upload_script(&mut self, script: &NewScript) -> Result<String> {
        let url = self.url("scripts/add_script.php")?;
        let form = Form::new()
            .text("ACTION", "UPLOAD_NEW")
            .text("MAX_FILE_SIZE", MAX_FILE_SIZE)
            .text("script_name", script.name.clone())
            .text("script_type", script.script_type.as_str())
            .text("vim_version", script.vim_version.clone())
            .text("script_version", script.version.clone())
            .text("summary", script.summary.clone())
            .text("description", script.description.clone())
            .text("install_details", script.install_details.clone())
            .text("add_script", "upload")
            .part("script_file", Self::archive_part(&script.archive).await?);
        info!(name = %script.name, version = %script.version, "Uploading new script");
        let request = self.http.post(&url).multipart(form);
        self.post_expecting_redirect(&url, request, VishopError::UploadFailed)
            .await
    }

    async fn add_version(&mut self, version: &NewVersion) -> Result<String> {
        let url = self.url(&format!(
            "scripts/add_script_version.php?script_id={}",
            version.script_id
        ))?;
        let form = Form::new()
            .text("MAX_FILE_SIZE", MAX_FILE_SIZE)
            .text("vim_version", version.vim_version.clone())
            .text("script_version", version.version.clone())
            .text("version_comment", version.comment.clone())
            .text("script_id", version.script_id.clone())
            .text("add_script", "upload")
            .part("script_file", Self::archive_part(&version.archive).await?);
        info!(script_id = %version.script_id, version = %version.version, "Uploading new version");
        let request = self.http.post(&url).multipart(form);
        self.post_expecting_redirect(&url, request, VishopError::UpdateFailed)
            .await
    }

    async fn fetch_details(&mut self, script_id: &str) -> Result<ScriptDetails> {
        let url = self.url(&format!("scripts/edit_script.php?script_id={script_id}"))?;
        let body = self.get_page(&url).await?;
        scrape::parse_details(&body)
    }

    async fn update_details(&mut self, script_id: &str, details: &ScriptDetails) -> Result<()> {
        let url = self.url(&format!("scripts/edit_script.php?script_id={script_id}"))?;
        let form = [
            ("script_id", script_id),
            ("script_name", details.name.as_str()),
            ("summary", details.summary.as_str()),
            ("description", details.description.as_str()),
            ("install_details", details.install_details.as_str()),
            ("save", "update"),
        ];
        info!(script_id, "Updating script details");
        let request = self.http.post(&url).form(&form);
        self.post_expecting_redirect(&url, request, VishopError::DetailsUpdateFailed)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_site_paths_onto_the_base_url() {
        let client = VimOrgClient::new("https://www.vim.org/").unwrap();
        assert_eq!(
            client.url("scripts/script.php?script_id=7").unwrap(),
            "https://www.vim.org/scripts/script.php?script_id=7"
        );
        assert_eq!(
            client.url("/account/index.php").unwrap(),
            "https://www.vim.org/account/index.php"
        );
        assert_eq!(
            client.url("https://example.org/x").unwrap(),
            "https://example.org/x"
        );
    }
}
