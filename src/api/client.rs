// src/api/client.rs
//! Pure HTTP client wrapper for Notion API.
//!
//! This module provides a thin wrapper around reqwest for making
//! HTTP requests to the Notion API. It handles authentication, the per-call
//! timeout and basic request/response operations without business logic.

use super::parser;
use super::responses::{append_children_body, create_page_body, QueryRequest};
use super::types::PaginatedResponse;
use crate::error::{AppError, RemoteCall};
use crate::model::{ContentBlock, EntityProperties, RemotePage};
use crate::types::{ApiKey, DataSourceId, PageId};
use reqwest::{header, Client, Response};
use serde::Serialize;
use std::time::Duration;

const NOTION_VERSION: &str = "2025-09-03";
const API_BASE_URL: &str = "https://api.notion.com/v1";

/// A thin wrapper around reqwest Client for Notion API requests.
#[derive(Clone)]
pub struct NotionHttpClient {
    client: Client,
    base_url: String,
}

impl NotionHttpClient {
    /// Creates a new HTTP client with Notion API authentication.
    ///
    /// Every request is bounded by `timeout`; expiry surfaces as
    /// `AppError::Timeout` for that call only.
    pub fn new(api_key: &ApiKey, timeout: Duration) -> Result<Self, AppError> {
        Self::with_base_url(api_key, timeout, API_BASE_URL)
    }

    /// Creates a client against a different API root (proxies, test servers).
    pub fn with_base_url(
        api_key: &ApiKey,
        timeout: Duration,
        base_url: impl Into<String>,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(api_key)?)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates the default headers for Notion API requests.
    fn create_headers(api_key: &ApiKey) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = format!("Bearer {}", api_key.as_str());
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&auth_header).map_err(|e| {
                AppError::ConfigurationMissing(format!("Invalid API token format: {}", e))
            })?,
        );

        headers.insert(
            "Notion-Version",
            header::HeaderValue::from_static(NOTION_VERSION),
        );

        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Makes a GET request to the specified endpoint.
    pub async fn get(
        &self,
        call: RemoteCall,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<String>, AppError> {
        let url = self.url(endpoint);
        log::debug!("GET {} {:?}", url, query);
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::from_transport(call, e))?;
        extract_response_text(call, response).await
    }

    /// Makes a POST request with JSON body to the specified endpoint.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        call: RemoteCall,
        endpoint: &str,
        body: &T,
    ) -> Result<ApiResponse<String>, AppError> {
        let url = self.url(endpoint);
        log::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::from_transport(call, e))?;
        extract_response_text(call, response).await
    }

    /// Makes a PATCH request with JSON body to the specified endpoint.
    pub async fn patch<T: Serialize + ?Sized>(
        &self,
        call: RemoteCall,
        endpoint: &str,
        body: &T,
    ) -> Result<ApiResponse<String>, AppError> {
        let url = self.url(endpoint);
        log::debug!("PATCH {}", url);
        let response = self
            .client
            .patch(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::from_transport(call, e))?;
        extract_response_text(call, response).await
    }
}

#[async_trait::async_trait]
impl super::NotionRepository for NotionHttpClient {
    async fn list_entities(
        &self,
        data_source: &DataSourceId,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<RemotePage>, AppError> {
        let endpoint = format!("data_sources/{}/query", data_source.to_dashed());
        let body = QueryRequest {
            page_size,
            start_cursor: cursor,
        };
        let result = self.post(RemoteCall::ListEntities, &endpoint, &body).await?;
        parser::parse_pages_pagination(result)
    }

    async fn list_entity_content(
        &self,
        page: &PageId,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<ContentBlock>, AppError> {
        let endpoint = format!("blocks/{}/children", page.to_dashed());
        let mut query = vec![("page_size", page_size.to_string())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor));
        }
        let result = self
            .get(RemoteCall::ListEntityContent, &endpoint, &query)
            .await?;
        parser::parse_blocks_pagination(result)
    }

    async fn create_entity(
        &self,
        data_source: &DataSourceId,
        properties: &EntityProperties,
    ) -> Result<PageId, AppError> {
        let body = create_page_body(data_source, properties);
        let result = self.post(RemoteCall::CreateEntity, "pages", &body).await?;
        parser::parse_created_page(result)
    }

    async fn append_content(&self, page: &PageId, blocks: &[ContentBlock]) -> Result<(), AppError> {
        let endpoint = format!("blocks/{}/children", page.to_dashed());
        let body = append_children_body(blocks);
        let result = self
            .patch(RemoteCall::AppendContent, &endpoint, &body)
            .await?;
        parser::ensure_success(result)
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
}

/// Extracts the response body as text with metadata.
pub async fn extract_response_text(
    call: RemoteCall,
    response: Response,
) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response
        .text()
        .await
        .map_err(|e| AppError::from_transport(call, e))?;

    log::debug!("{} -> {}", url, status);

    Ok(ApiResponse {
        data: text,
        status,
        url,
    })
}
