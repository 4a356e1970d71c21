use super::Category;
use crate::error::ClientError;

const ALLOWED_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// An image picked from the local device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    /// Accepts only `jpg`, `jpeg` and `png` files.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ClientError> {
        let name = name.into();
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        if !ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ClientError::Validation(format!(
                "Invalid image format: {name}"
            )));
        }

        Ok(Self { name, bytes })
    }

    /// MIME type derived from the (already validated) extension.
    pub fn content_type(&self) -> &'static str {
        if self.name.to_ascii_lowercase().ends_with(".png") {
            "image/png"
        } else {
            "image/jpeg"
        }
    }
}

/// An image either uploaded from disk or referenced by URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    File(LocalFile),
    Url(String),
}

impl ImageSource {
    pub fn as_url(&self) -> Option<&str> {
        match self {
            ImageSource::Url(url) => Some(url),
            ImageSource::File(_) => None,
        }
    }
}

/// In-progress post in the composition view.
///
/// Lives only as long as the view; it is either validated and submitted
/// as a whole or dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftPost {
    pub title: String,
    pub category: Option<Category>,
    /// Free-text category, only read when `category` is `Other`.
    pub other_category: String,
    pub thumbnail: Option<ImageSource>,
    /// Editor output (HTML).
    pub body: String,
}

impl DraftPost {
    pub fn new() -> Self {
        Self::default()
    }
}
