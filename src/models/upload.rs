use camino::Utf8Path;
use std::fmt;
use std::sync::Arc;

/// Workflow phase. Single source of truth for what the user can do next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UploadState {
    /// No file selected
    #[default]
    Idle,
    /// A validated image is held, not yet submitted
    FileSelected,
    /// Detection request in flight
    Processing,
    /// A detection result is held
    Completed,
    /// The last request failed; the file is kept for a retry
    Failed,
}

impl UploadState {
    /// Whether a new file may be selected in this phase
    pub fn accepts_selection(self) -> bool {
        !matches!(self, Self::Processing)
    }

    /// Whether `submit()` would issue a request, given a held file
    pub fn accepts_submit(self) -> bool {
        matches!(self, Self::FileSelected | Self::Failed)
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::FileSelected => "file selected",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Image picked by the user, held until it is submitted or discarded.
///
/// Content is reference counted so snapshots and the in-flight request can
/// share it without copying the image.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    content_type: String,
    content: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk, inferring its content type from the extension
    pub async fn from_path(path: &Utf8Path) -> std::io::Result<Self> {
        let content = tokio::fs::read(path).await?;
        let name = path.file_name().unwrap_or(path.as_str()).to_string();
        let content_type = content_type_for(path);

        tracing::debug!(
            "Loaded {} ({} bytes, {})",
            name,
            content.len(),
            content_type
        );

        Ok(Self::new(name, content_type, content))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Size in MiB, for display
    pub fn size_mb(&self) -> f64 {
        self.content.len() as f64 / 1024.0 / 1024.0
    }

    /// Same selection: equal name and the very same content buffer
    pub fn shares_content(&self, other: &SelectedFile) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.content, &other.content)
    }

    /// True when the content type identifies an image
    pub fn is_image(&self) -> bool {
        self.content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

// Content is left out; images are large.
impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.content.len())
            .finish()
    }
}

/// Map a file extension to a MIME type
pub fn content_type_for(path: &Utf8Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
