use crate::error::{GenerationError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// File reference as the hosted model returns it inside a gallery entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub orig_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GalleryEntry {
    pub image: ImageRef,
    #[serde(default)]
    pub caption: Option<String>,
}

/// A generated image the user can view and download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageItem {
    pub index: usize,
    pub url: String,
    pub caption: Option<String>,
}

impl ImageItem {
    pub fn file_name(&self) -> String {
        download_file_name(self.index)
    }
}

/// Images from one successful call, in the order the service returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub items: Vec<ImageItem>,
}

impl GenerationResult {
    /// Decode the first positional output of a `/generate_image` call.
    pub fn from_outputs(outputs: &[Value]) -> Result<Self> {
        let entries = match outputs.first() {
            Some(Value::Array(entries)) if !entries.is_empty() => entries,
            _ => return Err(GenerationError::NoData),
        };

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry: GalleryEntry = match serde_json::from_value(entry.clone()) {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping malformed gallery entry: {}", e);
                    continue;
                }
            };
            match entry.image.url {
                Some(url) if !url.is_empty() => items.push(ImageItem {
                    index: items.len(),
                    url,
                    caption: entry.caption,
                }),
                _ => log::warn!("Skipping gallery entry without an image url"),
            }
        }

        if items.is_empty() {
            return Err(GenerationError::NoData);
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn download_file_name(index: usize) -> String {
    format!("generated-image-{}.webp", index + 1)
}
