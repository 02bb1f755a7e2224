//! Attaching an image to a multipart form.
//!
//! Two platform targets read images differently. A browser-like host only
//! has a URI it can fetch, so `BlobImageEncoder` downloads the bytes up
//! front. A native host hands out file URIs the upload stack can stream, so
//! `FileImageEncoder` only describes the file. The encoder is chosen once
//! when the client is built.

use std::path::Path;
use std::sync::Arc;

use crate::error::ClientError;
use crate::http::{FileContent, MultipartField};
use crate::transport::{BoxFuture, Transport};

/// Multipart field name the server reads images from.
pub const IMAGE_FIELD: &str = "image";
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";
pub const BLOB_FILENAME: &str = "photo.jpg";

pub trait ImageEncoder: Send + Sync {
    /// Turn an image URI into the `image` multipart field.
    fn encode<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<MultipartField, ClientError>>;
}

/// Fetches the URI and attaches the bytes with a fixed filename and type.
pub struct BlobImageEncoder {
    transport: Arc<dyn Transport>,
}

impl BlobImageEncoder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl ImageEncoder for BlobImageEncoder {
    fn encode<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<MultipartField, ClientError>> {
        Box::pin(async move {
            let bytes = self.transport.fetch_bytes(uri).await?;
            Ok(MultipartField::File {
                name: IMAGE_FIELD.to_string(),
                filename: BLOB_FILENAME.to_string(),
                mime: DEFAULT_IMAGE_MIME.to_string(),
                content: FileContent::Bytes(bytes),
            })
        })
    }
}

/// Describes a local file by URI; the transport reads it when sending.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageEncoder;

impl ImageEncoder for FileImageEncoder {
    fn encode<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<MultipartField, ClientError>> {
        Box::pin(async move {
            Ok(MultipartField::File {
                name: IMAGE_FIELD.to_string(),
                filename: filename_from_uri(uri),
                mime: image_mime_type(uri),
                content: FileContent::Uri(uri.to_string()),
            })
        })
    }
}

/// Image MIME type guessed from the extension, `image/jpeg` otherwise.
pub fn image_mime_type(uri: &str) -> String {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    mime_guess::from_path(Path::new(path))
        .iter()
        .find(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string())
}

/// Last path segment of the URI, or `photo.jpg` when there is none.
pub fn filename_from_uri(uri: &str) -> String {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    match path.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => BLOB_FILENAME.to_string(),
    }
}
