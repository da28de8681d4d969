use super::container::xml_options;
use super::{base_dir, resolve_href};
use crate::document::SectionNode;
use log::{debug, warn};

const OPS_NAMESPACE: &str = "http://www.idpf.org/2007/ops";

/// Split a content reference into its path and fragment. A reference with
/// more than one `#` keeps only the first fragment.
pub fn split_content_ref(src: &str) -> (&str, Option<&str>) {
    let mut parts = src.split('#');
    let path = parts.next().unwrap_or_default();
    let fragment = parts.next().filter(|f| !f.is_empty());
    if parts.next().is_some() {
        warn!("Content reference {src:?} has more than one fragment, keeping the first");
    }
    (path, fragment)
}

/// Parse an NCX document into a section tree rooted at a synthetic `root`.
///
/// A `navPoint` needs a non-empty `navLabel` and exactly one `content`
/// child with a `src`; otherwise it is dropped together with its subtree.
/// Returns `None` only when the document itself cannot be read.
pub fn parse_ncx(xml: &str, ncx_path: &str) -> Option<SectionNode> {
    let content = xml.trim_start_matches('\u{feff}');
    let doc = match roxmltree::Document::parse_with_options(content, xml_options()) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Could not parse navigation document {ncx_path}: {e}");
            return None;
        }
    };

    let base = base_dir(ncx_path);
    let Some(nav_map) = doc
        .descendants()
        .find(|n| n.tag_name().name() == "navMap")
    else {
        warn!("{ncx_path} has no navMap");
        return Some(SectionNode::root(Vec::new()));
    };

    let sections: Vec<SectionNode> = elements(nav_map, "navPoint")
        .filter_map(|point| build_nav_point(point, base))
        .collect();
    debug!("{ncx_path}: {} top-level sections", sections.len());
    Some(SectionNode::root(sections))
}

fn build_nav_point(point: roxmltree::Node, base: &str) -> Option<SectionNode> {
    let id = point.attribute("id").unwrap_or("?");

    let contents: Vec<_> = elements(point, "content").collect();
    if contents.len() != 1 {
        warn!(
            "Dropping navPoint {id}: expected one content element, found {}",
            contents.len()
        );
        return None;
    }
    let Some(src) = contents[0].attribute("src").filter(|s| !s.trim().is_empty()) else {
        warn!("Dropping navPoint {id}: content has no src");
        return None;
    };

    let label = elements(point, "navLabel")
        .next()
        .and_then(|label| label.descendants().find(|n| n.tag_name().name() == "text"))
        .map(collect_text)
        .filter(|text| !text.is_empty());
    let Some(label) = label else {
        warn!("Dropping navPoint {id}: missing label");
        return None;
    };

    Some(section(label, src.trim(), base, children_of(point, base)))
}

fn children_of(point: roxmltree::Node, base: &str) -> Vec<SectionNode> {
    elements(point, "navPoint")
        .filter_map(|child| build_nav_point(child, base))
        .collect()
}

/// Parse an EPUB 3 navigation document (`<nav epub:type="toc">`).
///
/// Each `li` needs exactly one `a` with an `href`; items without one are
/// dropped with their nested list.
pub fn parse_nav_document(xml: &str, nav_path: &str) -> Option<SectionNode> {
    let content = xml.trim_start_matches('\u{feff}');
    let doc = match roxmltree::Document::parse_with_options(content, xml_options()) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Could not parse navigation document {nav_path}: {e}");
            return None;
        }
    };

    let navs: Vec<_> = doc
        .descendants()
        .filter(|n| n.tag_name().name() == "nav")
        .collect();
    let toc_nav = navs
        .iter()
        .find(|nav| {
            nav.attribute((OPS_NAMESPACE, "type"))
                .or_else(|| nav.attribute("type"))
                .is_some_and(|t| t.split_whitespace().any(|t| t == "toc"))
        })
        .or_else(|| navs.first());
    let Some(nav) = toc_nav else {
        warn!("{nav_path} has no nav element");
        return Some(SectionNode::root(Vec::new()));
    };

    let base = base_dir(nav_path);
    let sections = elements(*nav, "ol")
        .next()
        .map(|list| build_list(list, base))
        .unwrap_or_default();
    debug!("{nav_path}: {} top-level sections", sections.len());
    Some(SectionNode::root(sections))
}

fn build_list(list: roxmltree::Node, base: &str) -> Vec<SectionNode> {
    elements(list, "li")
        .filter_map(|item| build_list_item(item, base))
        .collect()
}

fn build_list_item(item: roxmltree::Node, base: &str) -> Option<SectionNode> {
    let links: Vec<_> = elements(item, "a").collect();
    if links.len() != 1 {
        warn!(
            "Dropping nav entry: expected one link, found {}",
            links.len()
        );
        return None;
    }
    let link = links[0];
    let Some(href) = link.attribute("href").filter(|h| !h.trim().is_empty()) else {
        warn!("Dropping nav entry without href");
        return None;
    };
    let label = collect_text(link);
    if label.is_empty() {
        warn!("Dropping nav entry {href}: missing label");
        return None;
    }

    let children = elements(item, "ol")
        .next()
        .map(|list| build_list(list, base))
        .unwrap_or_default();
    Some(section(label, href.trim(), base, children))
}

fn section(label: String, src: &str, base: &str, children: Vec<SectionNode>) -> SectionNode {
    let (path, fragment) = split_content_ref(src);
    let mut node = SectionNode::new(label, resolve_href(base, path)).with_children(children);
    node.fragment_id = fragment.map(str::to_string);
    node
}

fn elements<'a, 'input: 'a>(
    node: roxmltree::Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn collect_text(node: roxmltree::Node) -> String {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
