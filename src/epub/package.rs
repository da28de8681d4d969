use super::container::xml_options;
use super::{base_dir, resolve_href};
use crate::document::DocumentMetadata;
use crate::error::ExtractionError;
use log::{debug, warn};
use std::collections::HashMap;

const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

const TEXT_MEDIA_TYPES: [&str; 4] = [
    "application/xhtml+xml",
    "text/html",
    "application/x-dtbook+xml",
    "text/plain",
];

/// One resource declared in the manifest. `href` is already resolved to a
/// full archive path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Vec<String>,
}

impl ManifestItem {
    pub fn is_textual(&self) -> bool {
        TEXT_MEDIA_TYPES.contains(&self.media_type.as_str())
    }

    pub fn is_plain_text(&self) -> bool {
        self.media_type == "text/plain"
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }
}

/// Where the table of contents comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationSource<'a> {
    /// EPUB 2 NCX referenced by `spine@toc`
    Ncx(&'a ManifestItem),
    /// EPUB 3 XHTML navigation document (`properties="nav"`)
    NavDocument(&'a ManifestItem),
}

/// Parsed package descriptor (OPF): metadata, manifest and spine.
#[derive(Debug, Clone, Default)]
pub struct PackageDescriptor {
    pub metadata: DocumentMetadata,
    pub manifest: HashMap<String, ManifestItem>,
    /// Manifest ids in reading order.
    pub spine: Vec<String>,
    pub toc_id: Option<String>,
    cover_id: Option<String>,
}

impl PackageDescriptor {
    /// Parse the descriptor found at `package_path` inside the archive.
    ///
    /// The `manifest` and `spine` elements are required. Items missing an
    /// attribute are skipped with a warning.
    pub fn parse(xml: &str, package_path: &str) -> Result<Self, ExtractionError> {
        let content = xml.trim_start_matches('\u{feff}');
        let doc = roxmltree::Document::parse_with_options(content, xml_options())
            .map_err(|e| ExtractionError::malformed(format!("{package_path}: {e}")))?;
        let root = doc.root_element();
        if root.tag_name().name() != "package" {
            return Err(ExtractionError::malformed(format!(
                "{package_path}: root element is <{}>, expected <package>",
                root.tag_name().name()
            )));
        }

        let base = base_dir(package_path);
        let mut package = PackageDescriptor::default();

        if let Some(metadata) = child(root, "metadata") {
            package.read_metadata(metadata);
        } else {
            debug!("{package_path} has no metadata element");
        }

        let manifest = child(root, "manifest")
            .ok_or_else(|| ExtractionError::malformed(format!("{package_path}: no <manifest>")))?;
        for item in manifest.children().filter(|n| n.tag_name().name() == "item") {
            let (Some(id), Some(href), Some(media_type)) = (
                item.attribute("id"),
                item.attribute("href"),
                item.attribute("media-type"),
            ) else {
                warn!("Skipping manifest item without id/href/media-type: {item:?}");
                continue;
            };
            let href = href.split('#').next().unwrap_or(href);
            let properties = item
                .attribute("properties")
                .map(|p| p.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            package.manifest.insert(
                id.to_string(),
                ManifestItem {
                    id: id.to_string(),
                    href: resolve_href(base, href),
                    media_type: media_type.trim().to_ascii_lowercase(),
                    properties,
                },
            );
        }

        let spine = child(root, "spine")
            .ok_or_else(|| ExtractionError::malformed(format!("{package_path}: no <spine>")))?;
        package.toc_id = spine.attribute("toc").map(str::to_string);
        for itemref in spine.children().filter(|n| n.tag_name().name() == "itemref") {
            match itemref.attribute("idref") {
                Some(idref) if package.manifest.contains_key(idref) => {
                    package.spine.push(idref.to_string())
                }
                Some(idref) => warn!("Spine references unknown manifest id {idref:?}"),
                None => warn!("Skipping spine itemref without idref"),
            }
        }

        debug!(
            "Package {package_path}: {} manifest items, {} spine entries",
            package.manifest.len(),
            package.spine.len()
        );
        Ok(package)
    }

    fn read_metadata(&mut self, metadata: roxmltree::Node) {
        for node in metadata.children().filter(|n| n.is_element()) {
            let text = || {
                let value: String = node
                    .descendants()
                    .filter(|n| n.is_text())
                    .filter_map(|n| n.text())
                    .collect();
                let value = value.trim().to_string();
                (!value.is_empty()).then_some(value)
            };
            match node.tag_name().name() {
                "title" if self.metadata.title.is_none() => self.metadata.title = text(),
                "creator" => self.metadata.authors.extend(text()),
                "language" if self.metadata.language.is_none() => {
                    self.metadata.language = text()
                }
                "meta" if node.attribute("name") == Some("cover") => {
                    self.cover_id = node.attribute("content").map(str::to_string);
                }
                _ => {}
            }
        }
    }

    /// Position of a manifest id in the reading order.
    pub fn spine_position(&self, id: &str) -> Option<usize> {
        self.spine.iter().position(|spine_id| spine_id == id)
    }

    pub fn navigation(&self) -> Option<NavigationSource<'_>> {
        let ncx = self
            .toc_id
            .as_deref()
            .and_then(|id| self.manifest.get(id))
            .filter(|item| item.media_type == NCX_MEDIA_TYPE);
        if let Some(item) = ncx {
            return Some(NavigationSource::Ncx(item));
        }
        self.manifest
            .values()
            .find(|item| item.has_property("nav"))
            .map(NavigationSource::NavDocument)
    }

    /// Cover image: EPUB 3 `cover-image` property, then the EPUB 2
    /// `<meta name="cover">`, then any image whose id or href says "cover".
    pub fn cover_item(&self) -> Option<&ManifestItem> {
        let by_property = self
            .manifest
            .values()
            .find(|item| item.has_property("cover-image"));
        let by_meta = || {
            self.cover_id
                .as_deref()
                .and_then(|id| self.manifest.get(id))
                .filter(|item| item.is_image())
        };
        let by_name = || {
            let mut candidates: Vec<&ManifestItem> = self
                .manifest
                .values()
                .filter(|item| item.is_image())
                .filter(|item| {
                    item.id.to_lowercase().contains("cover")
                        || item.href.to_lowercase().contains("cover")
                })
                .collect();
            candidates.sort_by(|a, b| a.href.cmp(&b.href));
            candidates.into_iter().next()
        };
        by_property.or_else(by_meta).or_else(by_name)
    }
}

fn child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children().find(|n| n.tag_name().name() == name)
}
