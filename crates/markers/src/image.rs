//! Inline images for marker descriptions.
//!
//! Dropped image files become `data:` URIs embedded as markdown image links,
//! so a description stays a single self-contained string.

use crate::error::{MarkerError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::Path;

/// Image mime type for a file name, `None` for anything that is not `image/*`
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        _ => return None,
    };
    Some(mime)
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn image_markdown(file_name: &str, uri: &str) -> String {
    format!("![{file_name}]({uri})\n")
}

/// Append an image link to `description`
pub fn append_image(description: &mut String, file_name: &str, mime: &str, bytes: &[u8]) {
    description.push_str(&image_markdown(file_name, &data_uri(mime, bytes)));
}

/// Read an image file and render it as a markdown image link
pub async fn read_image_markdown(path: &Path) -> Result<String> {
    let mime = mime_for_path(path)
        .ok_or_else(|| MarkerError::UnsupportedImage(path.display().to_string()))?;
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    log::debug!("Embedding {} ({} bytes) as {mime}", file_name, bytes.len());
    Ok(image_markdown(&file_name, &data_uri(mime, &bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn only_image_extensions_are_accepted() {
        assert_eq!(mime_for_path(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(mime_for_path(Path::new("b.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("notes.txt")), None);
        assert_eq!(mime_for_path(Path::new("no_extension")), None);
    }

    #[test]
    fn append_builds_markdown_data_uri() {
        let mut description = String::from("Nice view\n");
        append_image(&mut description, "pier.png", "image/png", b"abc");
        assert_eq!(description, "Nice view\n![pier.png](data:image/png;base64,YWJj)\n");
    }

    #[tokio::test]
    async fn reads_image_file_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dot.gif");
        std::fs::write(&path, [0x47, 0x49, 0x46]).unwrap();

        let markdown = read_image_markdown(&path).await.unwrap();
        assert_eq!(markdown, "![dot.gif](data:image/gif;base64,R0lG)\n");
    }

    #[tokio::test]
    async fn rejects_non_image_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, "hi").unwrap();

        let result = read_image_markdown(&path).await;
        assert!(matches!(result, Err(MarkerError::UnsupportedImage(_))));
    }
}
