use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_API_PATH: &str = "do";
pub const DEFAULT_LOGIN_PAGE_TITLE: &str = "登录 - NAStool";
pub const DEFAULT_CONTENT_REGION_ID: &str = "page_content";
pub const DEFAULT_MENU_ID: &str = "navbar-menu";
pub const DEFAULT_SCROLL_POSITION_LIMIT: usize = 256;
pub const SHELL_CONFIG_ELEMENT_ID: &str = "nastool-shell-config";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Command endpoint, relative to the page origin.
    pub api_path: String,
    /// `<title>` of the login page; seeing it in a swapped fragment means the
    /// session expired.
    pub login_page_title: String,
    pub close_modals_on_navigate: bool,
    pub scroll_position_limit: usize,
    pub content_region_id: String,
    pub menu_id: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            api_path: DEFAULT_API_PATH.to_string(),
            login_page_title: DEFAULT_LOGIN_PAGE_TITLE.to_string(),
            close_modals_on_navigate: true,
            scroll_position_limit: DEFAULT_SCROLL_POSITION_LIMIT,
            content_region_id: DEFAULT_CONTENT_REGION_ID.to_string(),
            menu_id: DEFAULT_MENU_ID.to_string(),
        }
    }
}

impl ShellConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let parsed: Self = serde_json::from_str(raw)
            .map_err(|error| ConfigError::InvalidJson(error.to_string()))?;
        parsed.normalize()
    }

    pub fn normalize(self) -> Result<Self, ConfigError> {
        let api_path = normalize_api_path(&self.api_path)?;
        let login_page_title = self.login_page_title.trim().to_string();
        if login_page_title.is_empty() {
            return Err(ConfigError::EmptyLoginTitle);
        }
        let content_region_id = normalize_element_id(&self.content_region_id, "content_region_id")?;
        let menu_id = normalize_element_id(&self.menu_id, "menu_id")?;
        Ok(Self {
            api_path,
            login_page_title,
            close_modals_on_navigate: self.close_modals_on_navigate,
            scroll_position_limit: self.scroll_position_limit.max(1),
            content_region_id,
            menu_id,
        })
    }

    /// Endpoint with the cache-busting query the command POST carries.
    #[must_use]
    pub fn command_url(&self, nonce: f64) -> String {
        format!("{}?random={nonce}", self.api_path)
    }
}

pub fn normalize_api_path(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyApiPath);
    }
    Ok(trimmed.to_string())
}

fn normalize_element_id(raw: &str, field: &'static str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_start_matches('#');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyElementId(field));
    }
    Ok(trimmed.to_string())
}
