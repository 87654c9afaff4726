//! Server-issued session identity for one uploaded batch.
use serde::{Deserialize, Serialize};

/// A batch of uploaded files scoped by the server's session identifier.
///
/// `filenames` is exactly the list the upload call returned, in response order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: String,
    filenames: Vec<String>,
}

impl Session {
    pub fn new(id: impl Into<String>, filenames: Vec<String>) -> Self {
        Self {
            id: id.into(),
            filenames,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.filenames.iter().any(|name| name == filename)
    }

    /// Server-relative path of an uploaded file on the static preview surface.
    /// Both segments are percent-encoded.
    pub fn preview_path(&self, filename: &str) -> String {
        format!(
            "/temp/{}/{}",
            urlencoding::encode(&self.id),
            urlencoding::encode(filename)
        )
    }
}
