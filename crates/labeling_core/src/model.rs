/// The class a labeling session confirms images against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ImageClass {
    pub id: i64,
    pub name: String,
}

impl ImageClass {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Optional details reported by the image-search API for a result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceMetadata {
    pub title: Option<String>,
    pub webpage_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A candidate image as returned by a remote image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub id: String,
    pub url: String,
    pub source: Option<SourceMetadata>,
}

impl ImageReference {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: SourceMetadata) -> Self {
        self.source = Some(source);
        self
    }
}
