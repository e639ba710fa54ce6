//! Core image types: formats, uploads, encoded images and results.

use crate::error::{ProPhotoError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Media types accepted for upload start with this prefix.
const IMAGE_MEDIA_PREFIX: &str = "image/";

/// Media type reported for files whose extension is not recognized.
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Attempts to detect format from a MIME type.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        None
    }
}

/// Returns true if `media_type` names an image (`image/...`).
pub fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .trim()
        .to_ascii_lowercase()
        .starts_with(IMAGE_MEDIA_PREFIX)
}

/// Infers a media type from a file name the way a browser file picker does.
pub fn media_type_for_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FALLBACK_MEDIA_TYPE;
    };
    if let Some(format) = ImageFormat::from_extension(ext) {
        return format.mime_type();
    }
    match ext.to_lowercase().as_str() {
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "json" => "application/json",
        _ => FALLBACK_MEDIA_TYPE,
    }
}

/// A file the user picked, read into memory.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    name: String,
    media_type: String,
    bytes: Vec<u8>,
}

impl UploadedImage {
    /// Creates an upload, rejecting anything whose media type is not `image/...`.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let media_type = media_type.into();
        if !is_image_media_type(&media_type) {
            return Err(ProPhotoError::InvalidInput(format!(
                "unsupported media type '{media_type}'"
            )));
        }
        Ok(Self {
            name: name.into(),
            media_type,
            bytes,
        })
    }

    /// Original file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared media type.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Raw file bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encodes the upload as a data URI.
    pub fn encode(&self) -> EncodedImage {
        EncodedImage::from_bytes(&self.media_type, &self.bytes)
    }
}

/// Textual (base64) form of an image, optionally prefixed with a
/// `data:<mime>;base64,` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage(String);

impl EncodedImage {
    /// Encodes raw bytes as a data URI.
    pub fn from_bytes(media_type: &str, bytes: &[u8]) -> Self {
        let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self::from_payload(media_type, &payload)
    }

    /// Wraps an already base64-encoded payload in a data URI header.
    pub fn from_payload(media_type: &str, payload: &str) -> Self {
        Self(format!("data:{media_type};base64,{payload}"))
    }

    /// Accepts either a bare base64 payload or a `data:` URI.
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if let Some((header, _)) = text.split_once(',') {
            if !header.starts_with("data:") || !header.ends_with(";base64") {
                return Err(ProPhotoError::Decode(
                    "metadata prefix is not a base64 data URI header".into(),
                ));
            }
        }
        let image = Self(text);
        if image.payload().trim().is_empty() {
            return Err(ProPhotoError::Decode("empty image payload".into()));
        }
        Ok(image)
    }

    /// The full text, header included when present.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base64 payload with any metadata prefix stripped.
    pub fn payload(&self) -> &str {
        match self.0.split_once(',') {
            Some((_, payload)) => payload,
            None => &self.0,
        }
    }

    /// The media type declared in the header, if there is one.
    pub fn media_type(&self) -> Option<&str> {
        let (header, _) = self.0.split_once(',')?;
        header
            .strip_prefix("data:")?
            .strip_suffix(";base64")
            .filter(|m| !m.is_empty())
    }

    /// Decodes the payload back to the original bytes.
    ///
    /// Tolerates embedded whitespace and missing padding.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let cleaned: String = self
            .payload()
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
            return Ok(data);
        }
        base64::engine::general_purpose::STANDARD_NO_PAD
            .decode(&cleaned)
            .map_err(|e| ProPhotoError::Decode(e.to_string()))
    }
}

impl std::fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The original upload paired with the transformed image.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "transformation result should be saved or displayed"]
pub struct TransformationResult {
    original: EncodedImage,
    transformed: EncodedImage,
}

impl TransformationResult {
    pub(crate) fn new(original: EncodedImage, transformed: EncodedImage) -> Self {
        Self {
            original,
            transformed,
        }
    }

    /// The uploaded image.
    pub fn original(&self) -> &EncodedImage {
        &self.original
    }

    /// The image returned by the service.
    pub fn transformed(&self) -> &EncodedImage {
        &self.transformed
    }

    /// Format of the transformed image, from its header or its bytes.
    pub fn transformed_format(&self) -> Option<ImageFormat> {
        self.transformed
            .media_type()
            .and_then(ImageFormat::from_mime_type)
            .or_else(|| {
                self.transformed
                    .decode()
                    .ok()
                    .and_then(|bytes| ImageFormat::from_magic_bytes(&bytes))
            })
    }
}
