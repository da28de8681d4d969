//! EPUB package structure extraction: container bootstrap, package
//! descriptor, content units and navigation tree.

pub mod container;
pub mod content;
pub mod extractor;
pub mod package;
pub mod toc;

pub use extractor::{
    CoverRef, ExtractOptions, Extraction, Resource, extract, extract_path, extract_with,
};
pub use package::{ManifestItem, NavigationSource, PackageDescriptor};

use percent_encoding::percent_decode_str;

/// Directory part of an archive path, with trailing slash (`""` at the root).
pub(crate) fn base_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..=pos],
        None => "",
    }
}

/// Resolve an href found in `base` (a directory inside the archive) to a
/// normalized archive path. Fragments must already be stripped.
pub(crate) fn resolve_href(base: &str, href: &str) -> String {
    let decoded = percent_decode_str(href).decode_utf8_lossy();
    let joined = if decoded.starts_with('/') {
        decoded.trim_start_matches('/').to_string()
    } else {
        format!("{base}{decoded}")
    };

    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
