//! JSON documents exchanged with the catalog host and the poem service

use anyhow::{bail, Context, Result};
use embedded_graphics::prelude::{Point, Size};
use embedded_graphics::primitives::Rectangle;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogLimits, ClockImage, ImageZone, Strip, TimeEntry};
use crate::clock::TimeCode;
use crate::source::{FontPreference, Note, Poem};

/// Body of the clock index, `{"times": [{"t": "1155", "i": [...]}]}`
#[derive(Debug, Deserialize)]
pub struct IndexDocument {
    pub times: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
pub struct IndexEntry {
    #[serde(rename = "t")]
    pub time: IndexTime,
    #[serde(rename = "i", default)]
    pub images: Vec<IndexImage>,
}

/// The index writes times as strings, older copies as numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IndexTime {
    Number(u16),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct IndexImage {
    pub url: String,
    #[serde(default)]
    pub tz: Option<IndexZone>,
    #[serde(default)]
    pub strip: Option<String>,
}

/// Text zone as analysed offline; a negative `x` means there is none
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IndexZone {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl IndexTime {
    fn time_code(&self) -> Result<TimeCode> {
        let value = match self {
            IndexTime::Number(value) => *value,
            IndexTime::Text(text) => text
                .trim()
                .parse::<u16>()
                .with_context(|| format!("time {:?} is not a number", text))?,
        };
        TimeCode::new(value).with_context(|| format!("time {} is not a 12-hour reading", value))
    }
}

impl IndexImage {
    fn zone(&self) -> ImageZone {
        match self.tz {
            Some(tz) if tz.x >= 0 && tz.y >= 0 && tz.w > 0 && tz.h > 0 => ImageZone::Explicit(Rectangle::new(
                Point::new(tz.x, tz.y),
                Size::new(tz.w as u32, tz.h as u32),
            )),
            _ => ImageZone::Strip(Strip::from_name(self.strip.as_deref().unwrap_or_default())),
        }
    }
}

impl IndexDocument {
    /// Resolve every record and validate the result as a whole
    pub fn into_catalog(self, limits: &CatalogLimits) -> Result<Catalog> {
        let entries = self
            .times
            .into_iter()
            .map(|entry| {
                let time_code = entry.time.time_code()?;
                let images = entry
                    .images
                    .iter()
                    .map(|image| ClockImage::new(image.url.clone(), image.zone()))
                    .collect();
                TimeEntry::new(time_code, images)
            })
            .collect::<Result<Vec<_>>>()?;
        Catalog::from_entries(entries, limits)
    }
}

pub fn parse_catalog(body: &[u8], limits: &CatalogLimits) -> Result<Catalog> {
    let document: IndexDocument = serde_json::from_slice(body).context("clock index is not valid JSON")?;
    document.into_catalog(limits)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeRequest<'a> {
    pub screen_id: &'a str,
    pub time24: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest<'a> {
    pub screen_id: &'a str,
    pub build_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest<'a> {
    pub screen_id: &'a str,
    pub poem_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeResponse {
    #[serde(default)]
    pub poem: Option<serde_json::Value>,
    #[serde(default)]
    pub preferred_font: Option<String>,
    #[serde(default)]
    pub poem_id: Option<serde_json::Value>,
    #[serde(default)]
    pub note: Option<NoteDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDocument {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub note_id: Option<serde_json::Value>,
}

/// Identifiers arrive as strings or numbers
fn id_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(text) if !text.is_empty() => Some(text),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl ComposeResponse {
    pub fn into_poem(self) -> Result<Poem> {
        let text = match self.poem {
            Some(serde_json::Value::String(text)) if !text.trim().is_empty() => text,
            Some(serde_json::Value::String(_)) => bail!("poem is empty"),
            Some(other) => bail!("poem is not text: {}", other),
            None => bail!("no poem in response"),
        };

        let note = self.note.and_then(|note| {
            let body = note.body.filter(|body| !body.trim().is_empty())?;
            Some(Note {
                body,
                note_id: id_text(note.note_id),
            })
        });

        Ok(Poem {
            text,
            font: FontPreference::from_name(self.preferred_font.as_deref().unwrap_or_default()),
            poem_id: id_text(self.poem_id),
            note,
        })
    }
}

pub fn parse_poem(body: &[u8]) -> Result<Poem> {
    let response: ComposeResponse = serde_json::from_slice(body).context("compose response is not valid JSON")?;
    response.into_poem()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{
        "times": [
            {"t": "1155", "i": [
                {"url": "https://example.test/1155a.png", "tz": {"x": 12, "y": 40, "w": 200, "h": 90}, "strip": "top"},
                {"url": "https://example.test/1155b.png", "tz": null, "strip": "bottom"}
            ]},
            {"t": 100, "i": [
                {"url": "https://example.test/0100.png", "tz": {"x": -1, "y": 0, "w": 0, "h": 0}}
            ]}
        ]
    }"#;

    #[test]
    fn index_resolves_zones_and_strips() {
        let catalog = parse_catalog(INDEX.as_bytes(), &CatalogLimits::default()).unwrap();
        assert_eq!(catalog.len(), 2);

        let late = &catalog.entries()[0];
        assert_eq!(late.time_code().value(), 1155);
        assert_eq!(
            late.images()[0].zone(),
            ImageZone::Explicit(Rectangle::new(Point::new(12, 40), Size::new(200, 90)))
        );
        assert_eq!(late.images()[1].zone(), ImageZone::Strip(Strip::Bottom));

        let one = &catalog.entries()[1];
        assert_eq!(one.time_code().value(), 100);
        assert_eq!(one.images()[0].zone(), ImageZone::Strip(Strip::Middle));
    }

    #[test]
    fn index_rejects_bad_documents() {
        let limits = CatalogLimits::default();
        assert!(parse_catalog(b"not json", &limits).is_err());
        assert!(parse_catalog(br#"{"times": []}"#, &limits).is_err());
        assert!(parse_catalog(br#"{"times": [{"t": "1375", "i": [{"url": "x"}]}]}"#, &limits).is_err());
        assert!(parse_catalog(br#"{"times": [{"t": "noon", "i": [{"url": "x"}]}]}"#, &limits).is_err());
        assert!(parse_catalog(br#"{"times": [{"t": "100", "i": []}]}"#, &limits).is_err());
    }

    #[test]
    fn compose_response_becomes_poem() {
        let body = br#"{
            "poem": "Time moves on / But clocks stand still",
            "preferredFont": "PLAYFAIR",
            "poemId": 42,
            "note": {"body": "Written at the station clock", "noteId": "n-7"}
        }"#;
        let poem = parse_poem(body).unwrap();
        assert_eq!(poem.text, "Time moves on / But clocks stand still");
        assert_eq!(poem.font, FontPreference::Playfair);
        assert_eq!(poem.poem_id.as_deref(), Some("42"));
        let note = poem.note.unwrap();
        assert_eq!(note.body, "Written at the station clock");
        assert_eq!(note.note_id.as_deref(), Some("n-7"));
    }

    #[test]
    fn compose_response_defaults() {
        let poem = parse_poem(br#"{"poem": "still", "note": {"body": "  "}}"#).unwrap();
        assert_eq!(poem.font, FontPreference::Inter);
        assert!(poem.poem_id.is_none());
        assert!(poem.note.is_none());
    }

    #[test]
    fn missing_or_malformed_poem_is_an_error() {
        assert!(parse_poem(br#"{"preferredFont": "INTER"}"#).is_err());
        assert!(parse_poem(br#"{"poem": null}"#).is_err());
        assert!(parse_poem(br#"{"poem": 7}"#).is_err());
        assert!(parse_poem(br#"{"poem": ""}"#).is_err());
        assert!(parse_poem(b"<html>").is_err());
    }

    #[test]
    fn requests_use_camel_case() {
        let compose = serde_json::to_string(&ComposeRequest {
            screen_id: "A0B1C2D3E4F5",
            time24: "23:55",
        })
        .unwrap();
        assert_eq!(compose, r#"{"screenId":"A0B1C2D3E4F5","time24":"23:55"}"#);

        let like = serde_json::to_string(&LikeRequest {
            screen_id: "A0B1C2D3E4F5",
            poem_id: "42",
        })
        .unwrap();
        assert_eq!(like, r#"{"screenId":"A0B1C2D3E4F5","poemId":"42"}"#);
    }
}
