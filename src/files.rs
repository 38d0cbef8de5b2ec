//! Files served for requests outside the API prefix.

use std::{collections::HashMap, fmt, fs, io, path::Path};

/// A file found by a [`FileLookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    pub contents: Vec<u8>,
    pub mime_type: &'static str,
}

/// Source of files for non-API requests.
///
/// `path` is the request path without its leading `/`. Any error is
/// answered with `404 Not Found`.
///
/// # Examples
/// ```
/// use spindle::files::{FileLookup, StaticFile};
/// use std::io;
///
/// struct Embedded;
///
/// impl FileLookup for Embedded {
///     fn lookup(&self, path: &str) -> io::Result<StaticFile> {
///         match path {
///             "" | "index.html" => Ok(StaticFile {
///                 contents: b"<h1>Hello</h1>".to_vec(),
///                 mime_type: "text/html",
///             }),
///             _ => Err(io::ErrorKind::NotFound.into()),
///         }
///     }
/// }
/// ```
pub trait FileLookup: Send + Sync + 'static {
    fn lookup(&self, path: &str) -> io::Result<StaticFile>;
}

/// Reads files from a folder on disk.
///
/// A path is first replaced through the mapping table (exact match only),
/// then appended to the folder. Paths with a `..` segment are never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFolder {
    folder: String,
    mappings: HashMap<String, String>,
}

impl AppFolder {
    /// `folder` is used as a plain prefix, so it should end with `/`.
    pub fn new(folder: impl Into<String>, mappings: HashMap<String, String>) -> Self {
        AppFolder {
            folder: folder.into(),
            mappings,
        }
    }

    /// Resolves a request path to the path that would be read.
    pub fn resolve(&self, path: &str) -> Option<String> {
        let path = self.mappings.get(path).map_or(path, String::as_str);

        if path.split(['/', '\\']).any(|segment| segment == "..") {
            return None;
        }

        Some(format!("{}{}", self.folder, path))
    }
}

impl FileLookup for AppFolder {
    fn lookup(&self, path: &str) -> io::Result<StaticFile> {
        let full_path = self
            .resolve(path)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;

        let contents = fs::read(&full_path)?;

        Ok(StaticFile {
            contents,
            mime_type: mime_type(Path::new(&full_path)),
        })
    }
}

impl fmt::Display for AppFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} mappings)", self.folder, self.mappings.len())
    }
}

/// Guesses a mime type from the file extension.
pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match ext.to_ascii_lowercase().as_str() {
        // Text
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/vnd.microsoft.icon",
        "webp" => "image/webp",

        // Audio/Video
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/x-wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",

        // Other
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "wasm" => "application/wasm",

        _ => "application/octet-stream",
    }
}
