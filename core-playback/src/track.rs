//! Media items requested by callers and the track value shown while they play.

use bridge_traits::SampleBuffer;
use serde::{Deserialize, Serialize};

/// Title shown while content is being generated or fetched.
pub const LOADING_TITLE: &str = "Loading Content...";

/// Where an item's audio comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Script and speech produced on demand by the content provider.
    Generated {
        prompt: String,
        /// Voice preference; the configured default applies when absent.
        voice: Option<String>,
    },
    /// A creator upload reachable through the media fetcher.
    Uploaded { url: String },
}

impl SourceKind {
    /// Stable label used in events and logs.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Generated { .. } => "generated",
            SourceKind::Uploaded { .. } => "uploaded",
        }
    }
}

/// A station, episode or upload the caller asks to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    pub author: String,
    pub artwork_url: Option<String>,
    pub source: SourceKind,
}

impl MediaItem {
    /// AI-hosted item generated from `prompt`.
    pub fn generated(
        id: impl Into<String>,
        title: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: String::new(),
            artwork_url: None,
            source: SourceKind::Generated {
                prompt: prompt.into(),
                voice: None,
            },
        }
    }

    /// Creator upload stored at `url`.
    pub fn uploaded(
        id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            artwork_url: None,
            source: SourceKind::Uploaded { url: url.into() },
        }
    }

    /// Set the voice of a generated item. No effect on uploads.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        if let SourceKind::Generated { voice: slot, .. } = &mut self.source {
            *slot = Some(voice.into());
        }
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_artwork(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    pub fn is_upload(&self) -> bool {
        matches!(self.source, SourceKind::Uploaded { .. })
    }

    /// Voice used for generation, falling back to `default_voice`.
    pub fn voice_or<'a>(&'a self, default_voice: &'a str) -> &'a str {
        match &self.source {
            SourceKind::Generated {
                voice: Some(voice), ..
            } if !voice.trim().is_empty() => voice,
            _ => default_voice,
        }
    }

    /// Artist line for the player bar: the author for uploads, the AI host
    /// voice for generated content.
    pub fn artist_label(&self, default_voice: &str) -> String {
        if self.is_upload() {
            self.author.clone()
        } else {
            format!("AI Host ({})", self.voice_or(default_voice))
        }
    }
}

/// What the player bar shows for the current item.
///
/// A pending track has no buffer and a zero duration. Once content decodes it
/// is replaced wholesale by a ready track; a track is never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub artwork_url: Option<String>,
    pub buffer: Option<SampleBuffer>,
    /// Mirrors the buffer's duration; 0 while pending.
    pub duration_secs: f64,
    /// Script the generated speech was synthesized from.
    pub script: Option<String>,
}

impl PlaybackTrack {
    /// Placeholder shown while `item` is being generated or fetched.
    pub fn pending(item: &MediaItem) -> Self {
        Self {
            id: item.id.clone(),
            title: LOADING_TITLE.to_string(),
            artist: item.title.clone(),
            artwork_url: item.artwork_url.clone(),
            buffer: None,
            duration_secs: 0.0,
            script: None,
        }
    }

    /// Ready track for `item` carrying the decoded `buffer`.
    pub fn ready(item: &MediaItem, artist: impl Into<String>, buffer: SampleBuffer) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            artist: artist.into(),
            artwork_url: item.artwork_url.clone(),
            duration_secs: buffer.duration_secs(),
            buffer: Some(buffer),
            script: None,
        }
    }

    pub fn with_script(mut self, script: Option<String>) -> Self {
        self.script = script;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.buffer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_artist_uses_voice_or_default() {
        let item = MediaItem::generated("s1", "Morning Jazz", "smooth jazz intro");
        assert_eq!(item.artist_label("Puck"), "AI Host (Puck)");
        assert_eq!(
            item.clone().with_voice("Kore").artist_label("Puck"),
            "AI Host (Kore)"
        );
        assert_eq!(item.with_voice("  ").artist_label("Puck"), "AI Host (Puck)");
    }

    #[test]
    fn upload_artist_is_author_and_voice_is_ignored() {
        let item = MediaItem::uploaded("u1", "Demo", "Ada", "file:///tmp/demo.wav").with_voice("Kore");
        assert!(item.is_upload());
        assert_eq!(item.artist_label("Puck"), "Ada");
        assert_eq!(item.source.label(), "uploaded");
    }

    #[test]
    fn pending_then_ready_track() {
        let item = MediaItem::generated("s1", "News", "headlines").with_artwork("https://img/1.png");
        let pending = PlaybackTrack::pending(&item);
        assert_eq!(pending.title, LOADING_TITLE);
        assert_eq!(pending.artist, "News");
        assert!(!pending.is_ready());
        assert_eq!(pending.duration_secs, 0.0);

        let ready = PlaybackTrack::ready(&item, "AI Host (Puck)", SampleBuffer::mono(vec![0.0; 48], 24))
            .with_script(Some("Good morning".into()));
        assert!(ready.is_ready());
        assert_eq!(ready.title, "News");
        assert_eq!(ready.duration_secs, 2.0);
        assert_eq!(ready.artwork_url.as_deref(), Some("https://img/1.png"));
        assert_eq!(ready.script.as_deref(), Some("Good morning"));
    }

    #[test]
    fn items_serialize_with_tagged_source() {
        let item = MediaItem::generated("s1", "News", "headlines").with_voice("Puck");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["source"]["kind"], "generated");
        assert_eq!(json["source"]["voice"], "Puck");
    }
}
