use crate::domain::integrations::{
    DocumentPull, Integration, OAuth2Capable, OAuth2ConnectionConfig, OAuth2InstanceConfig,
};
use crate::domain::models::Connection;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use reqwest::Client;
use tracing::warn;

const API_ROOT: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";

/// Notion integration: OAuth2-authorized workspace pull.
///
/// Page bodies arrive as a tree of blocks; each level of block children is
/// paginated with a `next_cursor` token and child blocks are expanded
/// recursively, indenting one tab per nesting level when flattened to text.
pub struct Notion;

#[async_trait]
impl Integration for Notion {
    fn name(&self) -> &'static str {
        "Notion"
    }

    fn default_slug(&self) -> &'static str {
        "notion"
    }

    fn logo_url(&self) -> Option<&'static str> {
        Some("/static/integration-logos/notion.svg")
    }

    fn validate_config(&self, config: &serde_json::Value) -> AppResult<()> {
        serde_json::from_value::<OAuth2InstanceConfig>(config.clone())
            .map(|_| ())
            .map_err(|e| AppError::ConnectionInvalid(format!("notion config: {}", e)))
    }

    fn validate_connection(&self, config: &serde_json::Value) -> bool {
        serde_json::from_value::<OAuth2ConnectionConfig>(config.clone()).is_ok()
    }

    async fn get_all_documents(
        &self,
        http: &Client,
        connection: &Connection,
    ) -> AppResult<DocumentPull> {
        let credentials: OAuth2ConnectionConfig =
            serde_json::from_value(connection.config.clone()).map_err(|e| {
                AppError::ConnectionInvalid(format!("notion connection config: {}", e))
            })?;

        let mut pull = DocumentPull::default();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = serde_json::Map::new();
            if let Some(c) = &cursor {
                body.insert("start_cursor".to_string(), serde_json::Value::String(c.clone()));
            }

            let response = http
                .post(format!("{}/v1/search", API_ROOT))
                .bearer_auth(&credentials.access_token)
                .header("Notion-Version", NOTION_VERSION)
                .json(&serde_json::Value::Object(body))
                .send()
                .await
                .map_err(|e| AppError::IntegrationError(format!("notion search failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                return Err(AppError::IntegrationError(format!(
                    "notion search returned {}: {}",
                    status, text
                )));
            }

            let data: serde_json::Value = response.json().await.map_err(|e| {
                AppError::IntegrationError(format!("notion search response: {}", e))
            })?;

            for object in data
                .get("results")
                .and_then(serde_json::Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default()
            {
                if object.get("object").and_then(serde_json::Value::as_str) != Some("page") {
                    continue;
                }
                match self
                    .read_page_record(http, &credentials.access_token, object)
                    .await
                {
                    Ok(document) => pull.documents.push(document),
                    Err(reason) => {
                        warn!("skipping notion page: {}", reason);
                        pull.skipped.push(reason);
                    }
                }
            }

            cursor = data
                .get("next_cursor")
                .and_then(serde_json::Value::as_str)
                .map(String::from);
            if cursor.is_none() {
                break;
            }
        }

        Ok(pull)
    }

    fn oauth2(&self) -> Option<&dyn OAuth2Capable> {
        Some(self)
    }
}

#[async_trait]
impl OAuth2Capable for Notion {
    fn oauth2_api_root(&self) -> &'static str {
        API_ROOT
    }

    fn authorization_endpoint(&self) -> &'static str {
        "/v1/oauth/authorize"
    }

    fn token_endpoint(&self) -> &'static str {
        "/v1/oauth/token"
    }

    fn extra_auth_params(&self) -> Vec<(String, String)> {
        vec![("owner".to_string(), "user".to_string())]
    }
}

impl Notion {
    /// Turn one search result into a document blob. Any missing or
    /// malformed field yields a skip reason rather than an error.
    async fn read_page_record(
        &self,
        http: &Client,
        access_token: &str,
        object: &serde_json::Value,
    ) -> Result<String, String> {
        let page_id = object
            .get("id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| "page record missing id".to_string())?;
        let title = page_title(object)
            .ok_or_else(|| format!("page {} has no readable title", page_id))?;
        let contents = self
            .read_block(http, access_token, page_id, 0)
            .await
            .map_err(|e| format!("page {}: {}", page_id, e))?;

        Ok(format!("=== {} === \n\n{}", title, contents))
    }

    /// Read a block's children, following `next_cursor` until exhausted and
    /// recursing into children-bearing blocks with one extra tab of depth.
    fn read_block<'a>(
        &'a self,
        http: &'a Client,
        access_token: &'a str,
        block_id: &'a str,
        num_tabs: usize,
    ) -> BoxFuture<'a, AppResult<String>> {
        Box::pin(async move {
            let mut result_lines: Vec<String> = Vec::new();
            let mut cursor: Option<String> = None;

            loop {
                let mut request = http
                    .get(format!("{}/v1/blocks/{}/children", API_ROOT, block_id))
                    .bearer_auth(access_token)
                    .header("Notion-Version", NOTION_VERSION);
                if let Some(c) = &cursor {
                    request = request.query(&[("start_cursor", c.as_str())]);
                }

                let response = request.send().await.map_err(|e| {
                    AppError::IntegrationError(format!("block children request failed: {}", e))
                })?;

                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(AppError::IntegrationError(format!(
                        "block children returned {}: {}",
                        status, text
                    )));
                }

                let data: serde_json::Value = response.json().await.map_err(|e| {
                    AppError::IntegrationError(format!("block children response: {}", e))
                })?;

                for result in data
                    .get("results")
                    .and_then(serde_json::Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default()
                {
                    let mut block_lines = rich_text_lines(result, num_tabs);

                    let has_children = result
                        .get("has_children")
                        .and_then(serde_json::Value::as_bool)
                        .unwrap_or(false);
                    if has_children {
                        if let Some(child_id) =
                            result.get("id").and_then(serde_json::Value::as_str)
                        {
                            let children = self
                                .read_block(http, access_token, child_id, num_tabs + 1)
                                .await?;
                            block_lines.push(children);
                        }
                    }

                    result_lines.push(block_lines.join("\n"));
                }

                cursor = data
                    .get("next_cursor")
                    .and_then(serde_json::Value::as_str)
                    .map(String::from);
                if cursor.is_none() {
                    break;
                }
            }

            Ok(result_lines.join("\n"))
        })
    }
}

/// Title of a page object: `properties.title.title[0].plain_text`.
fn page_title(object: &serde_json::Value) -> Option<String> {
    object
        .pointer("/properties/title/title/0/plain_text")
        .and_then(serde_json::Value::as_str)
        .map(String::from)
}

/// Flatten a block's rich text into tab-indented lines. Blocks without a
/// rich_text payload (images, dividers) produce no lines.
fn rich_text_lines(block: &serde_json::Value, num_tabs: usize) -> Vec<String> {
    let Some(block_type) = block.get("type").and_then(serde_json::Value::as_str) else {
        return Vec::new();
    };
    let Some(rich_text) = block
        .get(block_type)
        .and_then(|o| o.get("rich_text"))
        .and_then(serde_json::Value::as_array)
    else {
        return Vec::new();
    };

    let prefix = "\t".repeat(num_tabs);
    rich_text
        .iter()
        .filter_map(|entry| {
            entry
                .pointer("/text/content")
                .and_then(serde_json::Value::as_str)
                .map(|text| format!("{}{}", prefix, text))
        })
        .collect()
}
