//! Document store adapter (Notion API)

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};
use tracing::{debug, error, info, warn};

use super::issues::Priority;
use super::{IntegrationError, check_status, http_client};
use crate::config::ResolvedDocsConfig;

const SERVICE: &str = "notion";
const NOTION_VERSION: &str = "2022-06-28";

/// Largest text a single Notion rich-text block accepts
pub const MAX_BLOCK_CHARS: usize = 2000;

/// Create pages and append text to them
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a page; returns its id
    async fn create_page(&self, title: &str, priority: &str) -> Option<String>;

    /// Append text to a page, chunked at [`MAX_BLOCK_CHARS`]
    async fn append_content(&self, page_id: &str, text: &str) -> bool;
}

/// Split text into chunks of at most `max` characters
pub fn chunk_text(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(max).map(|c| c.iter().collect()).collect()
}

/// How the database models page status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusProperty {
    /// A native `status` property and its first option
    Status { name: String, option: String },
    /// A `select` named like "status" and its first option
    Select { name: String, option: String },
}

/// The properties of a database that page creation fills in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSchema {
    pub title: String,
    pub status: Option<StatusProperty>,
    pub priority: Option<String>,
}

impl DatabaseSchema {
    /// Discover title, status and priority properties from a database object
    pub fn discover(database: &Value) -> Self {
        let empty = Map::new();
        let properties = database
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let kind = |p: &Value| p.get("type").and_then(Value::as_str).unwrap_or_default().to_string();
        let first_option = |p: &Value, kind: &str| {
            p.get(kind)
                .and_then(|k| k.get("options"))
                .and_then(Value::as_array)
                .and_then(|o| o.first())
                .and_then(|o| o.get("name"))
                .and_then(Value::as_str)
                .map(String::from)
        };

        let mut schema = DatabaseSchema {
            title: "Name".to_string(),
            status: None,
            priority: None,
        };
        let mut title_found = false;

        for (name, prop) in properties {
            let lower = name.to_lowercase();
            match kind(prop).as_str() {
                "title" if !title_found => {
                    schema.title = name.clone();
                    title_found = true;
                }
                "status" if schema.status.is_none() => match first_option(prop, "status") {
                    Some(option) => {
                        schema.status = Some(StatusProperty::Status {
                            name: name.clone(),
                            option,
                        })
                    }
                    None => warn!(property = %name, "discover: status property has no options"),
                },
                "select" if lower.contains("status") && schema.status.is_none() => {
                    match first_option(prop, "select") {
                        Some(option) => {
                            schema.status = Some(StatusProperty::Select {
                                name: name.clone(),
                                option,
                            })
                        }
                        None => warn!(property = %name, "discover: status select has no options"),
                    }
                }
                "select" if lower.contains("priority") && schema.priority.is_none() => {
                    schema.priority = Some(name.clone());
                }
                _ => {}
            }
        }
        schema
    }

    /// The `properties` object of a new page
    pub fn page_properties(&self, title: &str, priority: &str) -> Value {
        let mut props = Map::new();
        props.insert(
            self.title.clone(),
            json!({ "title": [{ "text": { "content": title } }] }),
        );
        match &self.status {
            Some(StatusProperty::Status { name, option }) => {
                props.insert(name.clone(), json!({ "status": { "name": option } }));
            }
            Some(StatusProperty::Select { name, option }) => {
                props.insert(name.clone(), json!({ "select": { "name": option } }));
            }
            None => {}
        }
        if let Some(name) = &self.priority {
            props.insert(
                name.clone(),
                json!({ "select": { "name": Priority::parse(priority).display_name() } }),
            );
        }
        Value::Object(props)
    }
}

/// One paragraph block per chunk
fn paragraph_blocks(text: &str) -> Vec<Value> {
    chunk_text(text, MAX_BLOCK_CHARS)
        .into_iter()
        .map(|chunk| {
            json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": [{ "type": "text", "text": { "content": chunk } }] }
            })
        })
        .collect()
}

/// Notion client bound to one database
pub struct NotionClient {
    http: Client,
    token: String,
    database_id: String,
    base_url: String,
}

impl NotionClient {
    pub fn from_config(config: &ResolvedDocsConfig) -> Result<Self, IntegrationError> {
        debug!(database_id = %config.database_id, "NotionClient::from_config: called");
        Ok(Self {
            http: http_client()?,
            token: config.token.clone(),
            database_id: config.database_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/v1/{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn schema(&self) -> Result<DatabaseSchema, IntegrationError> {
        let response = self
            .request(reqwest::Method::GET, &format!("databases/{}", self.database_id))
            .send()
            .await?;
        let database: Value = check_status(SERVICE, response).await?.json().await?;
        Ok(DatabaseSchema::discover(&database))
    }

    async fn create(&self, title: &str, priority: &str) -> Result<String, IntegrationError> {
        let schema = self.schema().await?;
        debug!(?schema, "NotionClient::create: schema discovered");
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": schema.page_properties(title, priority),
        });
        let response = self.request(reqwest::Method::POST, "pages").json(&body).send().await?;
        let page: Value = check_status(SERVICE, response).await?.json().await?;
        page.get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| IntegrationError::Api {
                service: SERVICE,
                message: "page response has no id".to_string(),
            })
    }

    async fn append(&self, page_id: &str, text: &str) -> Result<(), IntegrationError> {
        let body = json!({ "children": paragraph_blocks(text) });
        let response = self
            .request(reqwest::Method::PATCH, &format!("blocks/{}/children", page_id))
            .json(&body)
            .send()
            .await?;
        check_status(SERVICE, response).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for NotionClient {
    async fn create_page(&self, title: &str, priority: &str) -> Option<String> {
        debug!(%title, %priority, "NotionClient::create_page: called");
        match self.create(title, priority).await {
            Ok(id) => {
                info!(page_id = %id, "Created document page");
                Some(id)
            }
            Err(e) => {
                error!(error = %e, "Failed to create document page");
                None
            }
        }
    }

    async fn append_content(&self, page_id: &str, text: &str) -> bool {
        debug!(%page_id, len = text.len(), "NotionClient::append_content: called");
        match self.append(page_id, text).await {
            Ok(()) => true,
            Err(e) => {
                error!(%page_id, error = %e, "Failed to append document content");
                false
            }
        }
    }
}
