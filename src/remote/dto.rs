use chrono::{DateTime, Utc};
use html_escape::decode_html_entities;
use serde::Deserialize;

use crate::domain::{Cursor, FeedItem, FeedPage};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPageDto {
    pub items: Vec<FeedItemDto>,
    #[serde(default)]
    pub next_cursor: Option<Cursor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItemDto {
    pub id: String,
    pub author: String,
    pub media_url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<FeedItemDto> for FeedItem {
    fn from(dto: FeedItemDto) -> Self {
        FeedItem {
            id: dto.id,
            author: dto.author,
            media_url: dto.media_url,
            caption: decode_html_entities(&dto.caption).to_string(),
            like_count: dto.like_count,
            created_at: dto.created_at,
        }
    }
}

impl From<FeedPageDto> for FeedPage {
    fn from(dto: FeedPageDto) -> Self {
        FeedPage {
            items: dto.items.into_iter().map(FeedItem::from).collect(),
            next_cursor: dto.next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page() {
        let json = r#"{
            "items": [{
                "id": "p1",
                "author": "ada",
                "mediaUrl": "https://cdn.example.com/p1.jpg",
                "caption": "first light",
                "likeCount": 3,
                "createdAt": "2024-05-01T12:00:00Z"
            }],
            "nextCursor": "c1"
        }"#;

        let page: FeedPage = serde_json::from_str::<FeedPageDto>(json).unwrap().into();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "p1");
        assert_eq!(page.items[0].like_count, 3);
        assert_eq!(page.next_cursor.as_deref(), Some("c1"));
    }

    #[test]
    fn test_caption_entities_are_decoded() {
        let json = r#"{
            "items": [{
                "id": "p1",
                "author": "ada",
                "mediaUrl": "https://cdn.example.com/p1.jpg",
                "caption": "fish &amp; chips",
                "createdAt": "2024-05-01T12:00:00Z"
            }]
        }"#;

        let page: FeedPage = serde_json::from_str::<FeedPageDto>(json).unwrap().into();
        assert_eq!(page.items[0].caption, "fish & chips");
    }

    #[test]
    fn test_missing_next_cursor_means_last_page() {
        let json = r#"{"items": []}"#;
        let page: FeedPage = serde_json::from_str::<FeedPageDto>(json).unwrap().into();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }
}
