//! Active tab provider: resolves which page is under analysis and loads its document.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::errors::AnalysisError;

/// Identity of the page under analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum TabHandle {
    Url(Url),
    File(PathBuf),
}

impl TabHandle {
    /// `http(s)://` addresses are fetched; anything else is read as a saved HTML file.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(TabHandle::Url(url)),
            _ => Some(TabHandle::File(PathBuf::from(raw))),
        }
    }
}

impl fmt::Display for TabHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabHandle::Url(url) => write!(f, "{url}"),
            TabHandle::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Source of the active tab. Swap implementations to host the popup elsewhere.
#[async_trait]
pub trait TabProvider: Send + Sync {
    /// `Ok(None)` when there is no addressable active tab.
    async fn active_tab(&self) -> Result<Option<TabHandle>, AnalysisError>;

    /// Read-only fetch of the tab's HTML.
    async fn load_document(&self, tab: &TabHandle) -> Result<String, AnalysisError>;
}

/// Tab chosen on the command line.
pub struct CommandLineTab {
    tab: Option<TabHandle>,
    client: Client,
}

impl CommandLineTab {
    pub fn new(tab: Option<TabHandle>, client: Client) -> Self {
        Self { tab, client }
    }
}

#[async_trait]
impl TabProvider for CommandLineTab {
    async fn active_tab(&self) -> Result<Option<TabHandle>, AnalysisError> {
        Ok(self.tab.clone())
    }

    async fn load_document(&self, tab: &TabHandle) -> Result<String, AnalysisError> {
        match tab {
            TabHandle::Url(url) => {
                debug!("Fetching tab document from {url}");
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    warn!("Tab {url} returned {status}");
                    return Err(AnalysisError::TabLoad(format!("{url} returned {status}")));
                }
                Ok(response.text().await?)
            }
            TabHandle::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AnalysisError::TabLoad(format!("{}: {e}", path.display()))),
        }
    }
}
