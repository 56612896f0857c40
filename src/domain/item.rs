//! Tab references, fetch modes, and fetched payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stash tab as the selection UI knows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabRef {
    pub id: String,
    pub name: String,
}

impl TabRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TabRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Which provider call is issued for each tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// The tab's full content
    #[default]
    FullContent,
    /// A priced sample derived from the tab
    DerivedSample,
}

impl FetchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMode::FullContent => "full_content",
            FetchMode::DerivedSample => "derived_sample",
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_content" | "full" => Ok(FetchMode::FullContent),
            "derived_sample" | "sample" => Ok(FetchMode::DerivedSample),
            other => Err(format!("unknown fetch mode: {}", other)),
        }
    }
}

/// Opaque provider output. The scheduler never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "data", rename_all = "snake_case")]
pub enum Payload {
    FullContent(Value),
    DerivedSample(Value),
}

impl Payload {
    pub fn mode(&self) -> FetchMode {
        match self {
            Payload::FullContent(_) => FetchMode::FullContent,
            Payload::DerivedSample(_) => FetchMode::DerivedSample,
        }
    }

    pub fn data(&self) -> &Value {
        match self {
            Payload::FullContent(v) | Payload::DerivedSample(v) => v,
        }
    }
}

/// One successfully fetched tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub item: TabRef,
    pub payload: Payload,
    pub region_key: String,
}

/// The tab currently opened for inspection outside the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTarget {
    pub item: TabRef,
    pub region_key: String,
    pub mode: FetchMode,
}
