use crate::error::ExtractionError;
use log::debug;

/// Fixed bootstrap file every EPUB carries.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

pub(crate) fn xml_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Path of the package descriptor named by the first `rootfile`.
pub fn find_package_path(container_xml: &str) -> Result<String, ExtractionError> {
    let content = container_xml.trim_start_matches('\u{feff}');
    let doc = roxmltree::Document::parse_with_options(content, xml_options())
        .map_err(|e| ExtractionError::descriptor_not_found(format!("{CONTAINER_PATH}: {e}")))?;

    let path = doc
        .descendants()
        .filter(|node| node.tag_name().name() == "rootfile")
        .filter_map(|node| node.attribute("full-path"))
        .map(str::trim)
        .find(|path| !path.is_empty())
        .ok_or_else(|| {
            ExtractionError::descriptor_not_found(format!("{CONTAINER_PATH} has no rootfile"))
        })?;

    debug!("Package descriptor at {path}");
    Ok(path.trim_start_matches('/').to_string())
}
