//! Text spans, structural addresses and detection entities

use serde::{Deserialize, Serialize};

/// One step of a structural address into a provider request tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressKey {
    /// Object member
    Key(String),
    /// Array element
    Index(usize),
}

/// Ordered sequence of keys/indices identifying where a text span lives
/// inside a request tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpanAddress(Vec<AddressKey>);

impl SpanAddress {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(AddressKey::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.0.push(AddressKey::Index(index));
        self
    }

    pub fn segments(&self) -> &[AddressKey] {
        &self.0
    }
}

impl std::fmt::Display for SpanAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            match segment {
                AddressKey::Key(k) => write!(f, "{}", k)?,
                AddressKey::Index(n) => write!(f, "{}", n)?,
            }
        }
        Ok(())
    }
}

/// An original piece of content extracted from a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// Where the text lives in the request tree
    pub address: SpanAddress,

    /// The raw text
    pub text: String,
}

/// A text span whose content has been rewritten, carrying the same address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskedSpan {
    pub address: SpanAddress,
    pub text: String,
}

/// Which detection source produced an entity.
///
/// Diagnostic only; the masker does not branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySource {
    /// External PII analyzer
    Analyzer,
    /// In-process secret scanner
    Scanner,
}

/// A labelled, scored half-open interval [start, end) over a span's text.
///
/// Offsets are byte offsets on UTF-8 character boundaries;
/// 0 <= start < end <= span.text.len().
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Category name, e.g. PERSON, EMAIL_ADDRESS, API_KEY
    pub category: String,

    /// Start byte offset (inclusive)
    pub start: usize,

    /// End byte offset (exclusive)
    pub end: usize,

    /// Confidence score (0.0 to 1.0)
    pub score: f32,

    /// Where the detection came from
    pub source: EntitySource,
}

impl Entity {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Strict overlap. Intervals touching at a single point do not overlap.
    pub fn overlaps(&self, other: &Entity) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display() {
        let address = SpanAddress::root()
            .key("messages")
            .index(0)
            .key("content")
            .index(1)
            .key("text");
        assert_eq!(address.to_string(), "messages.0.content.1.text");
    }

    #[test]
    fn test_overlap_is_strict() {
        let a = Entity {
            category: "PERSON".into(),
            start: 0,
            end: 4,
            score: 0.9,
            source: EntitySource::Analyzer,
        };
        let touching = Entity {
            category: "EMAIL_ADDRESS".into(),
            start: 4,
            end: 10,
            score: 0.9,
            source: EntitySource::Analyzer,
        };
        let crossing = Entity {
            category: "EMAIL_ADDRESS".into(),
            start: 3,
            end: 10,
            score: 0.9,
            source: EntitySource::Analyzer,
        };

        assert!(!a.overlaps(&touching));
        assert!(!touching.overlaps(&a));
        assert!(a.overlaps(&crossing));
        assert!(crossing.overlaps(&a));
    }
}
