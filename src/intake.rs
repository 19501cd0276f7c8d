//! Image intake: validates a picked or dropped file and prepares its preview.

use base64::{engine::general_purpose, Engine as _};

use crate::error::IntakeError;

/// A file handed to the application, tagged by how it arrived. Both entry
/// points go through the same validation.
#[derive(Debug, Clone)]
pub enum ImageSource {
    FilePicker(UploadedFile),
    Drop(UploadedFile),
}

#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: String,
    /// Content type as declared by the browser, possibly empty.
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageSource {
    fn into_file(self) -> UploadedFile {
        match self {
            ImageSource::FilePicker(file) | ImageSource::Drop(file) => file,
        }
    }
}

/// An accepted image. Replaced wholesale when the user picks another file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub file_name: String,
    pub mime_type: String,
    pub raw_bytes: Vec<u8>,
    /// `data:` URI the page can render without another round trip.
    pub preview: String,
}

pub fn select_file(source: ImageSource) -> Result<SelectedImage, IntakeError> {
    let origin = match &source {
        ImageSource::FilePicker(_) => "picker",
        ImageSource::Drop(_) => "drop",
    };
    let file = source.into_file();

    if file.bytes.is_empty() {
        tracing::debug!(origin, file = %file.file_name, "rejected empty file");
        return Err(IntakeError::Empty);
    }

    let mime_type = resolve_mime(&file.mime_type, &file.bytes).ok_or_else(|| {
        tracing::debug!(
            origin,
            file = %file.file_name,
            declared = %file.mime_type,
            "rejected non-image upload"
        );
        IntakeError::NotAnImage
    })?;

    let preview = data_uri(&mime_type, &file.bytes);
    tracing::info!(
        origin,
        file = %file.file_name,
        mime = %mime_type,
        bytes = file.bytes.len(),
        "image selected"
    );

    Ok(SelectedImage {
        file_name: file.file_name,
        mime_type,
        raw_bytes: file.bytes,
        preview,
    })
}

/// Declared `image/*` types win. A missing or generic declaration falls back
/// to sniffing the magic bytes.
fn resolve_mime(declared: &str, bytes: &[u8]) -> Option<String> {
    let declared = declared.trim().to_ascii_lowercase();
    if declared.starts_with("image/") {
        return Some(declared);
    }
    if declared.is_empty() || declared == "application/octet-stream" {
        return image::guess_format(bytes)
            .ok()
            .map(|format| format.to_mime_type().to_string());
    }
    None
}

pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}
