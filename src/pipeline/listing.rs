//! Directory listings for static roots without an index page.

use html_escape::encode_text;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt::Write as _;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Characters escaped in listing links.
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Decode a request path into its segments, rejecting traversal.
pub fn decode_segments(request_path: &str) -> Option<Vec<String>> {
    let mut segments = Vec::new();
    for raw in request_path.split('/').filter(|s| !s.is_empty()) {
        let segment = percent_decode_str(raw).decode_utf8().ok()?.into_owned();
        if segment.contains(['/', '\\', '\0']) {
            return None;
        }
        segments.push(segment);
    }
    Some(segments)
}

/// Whether any segment of the request path names a dotfile.
pub fn has_dot_segment(request_path: &str) -> bool {
    match decode_segments(request_path) {
        Some(segments) => segments.iter().any(|s| s.starts_with('.')),
        None => true,
    }
}

/// Map a request path onto the static root.
pub fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in decode_segments(request_path)? {
        let mut components = Path::new(&segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => path.push(part),
            _ => return None,
        }
    }
    Some(path)
}

/// Render an HTML listing of `dir`, linked relative to `request_path`.
pub async fn render(dir: &Path, request_path: &str, show_dotfiles: bool) -> io::Result<String> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !show_dotfiles && name.starts_with('.') {
            continue;
        }
        let is_dir = entry.file_type().await?.is_dir();
        entries.push((is_dir, name));
    }
    // Directories first, then by name.
    entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let title = encode_text(request_path);
    let mut html = String::with_capacity(256 + entries.len() * 64);
    let _ = write!(
        html,
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>Index of {title}</title></head>\n<body>\n<h1>Index of {title}</h1>\n<ul>\n"
    );
    if request_path != "/" {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }
    for (is_dir, name) in entries {
        let suffix = if is_dir { "/" } else { "" };
        let _ = writeln!(
            html,
            "<li><a href=\"{}{suffix}\">{}{suffix}</a></li>",
            utf8_percent_encode(&name, HREF),
            encode_text(&name),
        );
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    Ok(html)
}
