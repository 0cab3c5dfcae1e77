// src/api/responses.rs
//! Wire shapes of the Notion API requests and responses this crate uses.
//!
//! Only the fields the sync engine reads are modelled; everything else in a
//! response is ignored. Error bodies are decoded with notion-client's error
//! object.

use crate::constants::{AUTHOR_PROPERTY, RICH_TEXT_MAX_CHARS, TITLE_PROPERTY};
use crate::model::{ContentBlock, EntityProperties};
use crate::types::DataSourceId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

pub use notion_client::objects::error::Error as NotionError;

/// A page row from a data-source query.
#[derive(Debug, Clone, Deserialize)]
pub struct WirePage {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, WireProperty>,
}

/// A page property; only text-bearing kinds are distinguished.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireProperty {
    Title {
        #[serde(default)]
        title: Vec<WireRichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<WireRichText>,
    },
    #[serde(other)]
    Other,
}

/// A rich-text segment as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct WireRichText {
    #[serde(default)]
    pub plain_text: String,
}

/// Concatenates the plain text of every segment.
pub fn plain_text(segments: &[WireRichText]) -> String {
    segments.iter().map(|s| s.plain_text.as_str()).collect()
}

/// A child block of a page.
#[derive(Debug, Clone, Deserialize)]
pub struct WireBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub quote: Option<WireQuote>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireQuote {
    #[serde(default)]
    pub rich_text: Vec<WireRichText>,
}

/// The only field of a created page the engine needs.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPage {
    pub id: String,
}

/// Body of `POST data_sources/{id}/query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
}

/// Body of `POST pages`.
pub fn create_page_body(data_source: &DataSourceId, properties: &EntityProperties) -> Value {
    json!({
        "parent": {
            "type": "data_source_id",
            "data_source_id": data_source.to_dashed(),
        },
        "properties": {
            TITLE_PROPERTY: {
                "type": "title",
                "title": text_segments(&properties.title),
            },
            AUTHOR_PROPERTY: {
                "type": "rich_text",
                "rich_text": text_segments(&properties.author),
            },
        },
    })
}

/// Body of `PATCH blocks/{id}/children`.
///
/// Only quote blocks are ever written; other kinds are dropped.
pub fn append_children_body(blocks: &[ContentBlock]) -> Value {
    let children: Vec<Value> = blocks
        .iter()
        .filter_map(ContentBlock::quote_text)
        .map(|text| {
            json!({
                "object": "block",
                "type": "quote",
                "quote": { "rich_text": text_segments(text) },
            })
        })
        .collect();
    json!({ "children": children })
}

/// Text objects for `text`, split so that no segment exceeds the API limit.
///
/// Splitting happens on character boundaries, so the plain text read back
/// concatenates to exactly `text`.
pub fn text_segments(text: &str) -> Vec<Value> {
    split_for_rich_text(text)
        .into_iter()
        .map(|content| json!({ "type": "text", "text": { "content": content } }))
        .collect()
}

fn split_for_rich_text(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(RICH_TEXT_MAX_CHARS)
            .map_or(rest.len(), |(idx, _)| idx);
        let (head, tail) = rest.split_at(cut);
        segments.push(head);
        rest = tail;
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_text_is_split_on_char_boundaries() {
        let text = "é".repeat(RICH_TEXT_MAX_CHARS + 5);
        let segments = split_for_rich_text(&text);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].chars().count(), RICH_TEXT_MAX_CHARS);
        assert_eq!(segments.concat(), text);
    }

    #[test]
    fn empty_text_has_no_segments() {
        assert!(text_segments("").is_empty());
        assert_eq!(text_segments("short").len(), 1);
    }

    #[test]
    fn append_body_holds_quote_blocks() {
        let body = append_children_body(&[
            ContentBlock::quote("first"),
            ContentBlock::Other {
                kind: "divider".into(),
            },
        ]);
        let children = body["children"].as_array().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(
            children[0]["quote"]["rich_text"][0]["text"]["content"],
            "first"
        );
    }

    #[test]
    fn create_body_targets_the_data_source() {
        let ds = DataSourceId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let body = create_page_body(
            &ds,
            &EntityProperties {
                title: "Dune".into(),
                author: "Frank Herbert".into(),
            },
        );
        assert_eq!(
            body["parent"]["data_source_id"],
            "550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(
            body["properties"]["Title"]["title"][0]["text"]["content"],
            "Dune"
        );
        assert_eq!(
            body["properties"]["Author"]["rich_text"][0]["text"]["content"],
            "Frank Herbert"
        );
    }

    #[test]
    fn unknown_property_kinds_deserialize_as_other() {
        let prop: WireProperty =
            serde_json::from_str(r#"{"id":"x","type":"number","number":3}"#).unwrap();
        assert!(matches!(prop, WireProperty::Other));
    }
}
