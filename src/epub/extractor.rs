use super::container::{CONTAINER_PATH, find_package_path};
use super::content::{ContentConverter, ContentText, plain_text};
use super::package::{ManifestItem, NavigationSource, PackageDescriptor};
use super::toc;
use crate::document::{
    ChunkDescriptor, SectionNode, Token, TokenKind, TokenizedDocument, assign_offsets,
};
use crate::error::ExtractionError;
use crate::settings::ReaderSettings;
use crate::tokenizer::{LanguageCode, PositionedToken, Tokenizer};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::time::Instant;
use zip::ZipArchive;
use zip::result::ZipError;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A manifest item that is not reading content, returned as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub href: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverRef {
    pub href: String,
    pub media_type: String,
}

/// Everything pulled out of one archive.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub document: TokenizedDocument,
    pub cover: Option<CoverRef>,
    pub resources: Vec<Resource>,
}

impl Extraction {
    pub fn resource(&self, href: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.href == href)
    }

    pub fn cover_image(&self) -> Option<&Resource> {
        self.cover.as_ref().and_then(|c| self.resource(&c.href))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Tokenize content units on the rayon pool. Ignored without the
    /// `parallel` feature.
    pub parallel: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
        }
    }
}

impl From<&ReaderSettings> for ExtractOptions {
    fn from(settings: &ReaderSettings) -> Self {
        Self {
            parallel: settings.parallel_extraction && cfg!(feature = "parallel"),
        }
    }
}

const MAX_PREALLOCATION: u64 = 1 << 20;

/// Content unit read from the archive, waiting to be tokenized.
struct PendingChunk {
    position: usize,
    item: ManifestItem,
    content: ContentText,
}

pub fn extract_path(
    path: &Path,
    language: &LanguageCode,
    tokenizer: &Tokenizer,
) -> Result<Extraction, ExtractionError> {
    let file = File::open(path)?;
    info!("Loading {}", path.display());
    extract(BufReader::new(file), language, tokenizer)
}

pub fn extract<R: Read + Seek>(
    reader: R,
    language: &LanguageCode,
    tokenizer: &Tokenizer,
) -> Result<Extraction, ExtractionError> {
    extract_with(reader, language, tokenizer, ExtractOptions::default())
}

/// Read an EPUB archive into a tokenized document.
///
/// Fails only when the container or package descriptor is missing or
/// broken, the archive itself is unreadable, or the language's tokenizer
/// backend cannot start. Problems with single items are logged and the item
/// is skipped.
pub fn extract_with<R: Read + Seek>(
    reader: R,
    language: &LanguageCode,
    tokenizer: &Tokenizer,
    options: ExtractOptions,
) -> Result<Extraction, ExtractionError> {
    let started = Instant::now();
    let mut archive = ZipArchive::new(reader)?;

    let container = read_entry(&mut archive, CONTAINER_PATH)?
        .ok_or_else(|| ExtractionError::descriptor_not_found(format!("no {CONTAINER_PATH}")))?;
    let package_path = find_package_path(&String::from_utf8_lossy(&container))?;
    let package_xml = read_entry(&mut archive, &package_path)?.ok_or_else(|| {
        ExtractionError::descriptor_not_found(format!("{package_path} is not in the archive"))
    })?;
    let package = PackageDescriptor::parse(&String::from_utf8_lossy(&package_xml), &package_path)?;

    let navigation_href = package.navigation().map(|nav| match nav {
        NavigationSource::Ncx(item) | NavigationSource::NavDocument(item) => item.href.clone(),
    });

    let mut pending = Vec::new();
    let mut resources = Vec::new();
    for item in package.manifest.values() {
        if !item.is_textual() {
            match read_entry(&mut archive, &item.href)? {
                Some(data) => resources.push(Resource {
                    href: item.href.clone(),
                    media_type: item.media_type.clone(),
                    data,
                }),
                None => warn!("Manifest item {} ({}) is missing from the archive", item.id, item.href),
            }
            continue;
        }

        let Some(position) = package.spine_position(&item.id) else {
            if navigation_href.as_deref() == Some(item.href.as_str()) {
                debug!("Navigation document {} is not in the spine", item.href);
            } else {
                warn!("Dropping {} ({}): not referenced by the spine", item.id, item.href);
            }
            continue;
        };
        let Some(bytes) = read_entry(&mut archive, &item.href)? else {
            warn!("Spine item {} ({}) is missing from the archive", item.id, item.href);
            continue;
        };
        let content = if item.is_plain_text() {
            plain_text(&bytes)
        } else {
            ContentConverter::new().convert(&bytes)?
        };
        pending.push(PendingChunk {
            position,
            item: item.clone(),
            content,
        });
    }
    pending.sort_by_key(|chunk| chunk.position);
    resources.sort_by(|a, b| a.href.cmp(&b.href));

    let tokenized = tokenize_chunks(&pending, language, tokenizer, options)?;
    let (tokens, mut chunks) = merge_chunks(&pending, tokenized);
    assign_offsets(&mut chunks);

    let sections = match package.navigation() {
        Some(source) => read_navigation(&mut archive, source)?,
        None => {
            debug!("{package_path} declares no navigation");
            None
        }
    };

    let cover = package.cover_item().map(|item| CoverRef {
        href: item.href.clone(),
        media_type: item.media_type.clone(),
    });

    let document = TokenizedDocument::from_parts(tokens, chunks, sections, package.metadata);
    info!(
        "Extracted {} chunks, {} tokens, {} resources in {:?}",
        document.chunks().len(),
        document.len(),
        resources.len(),
        started.elapsed()
    );
    Ok(Extraction {
        document,
        cover,
        resources,
    })
}

fn tokenize_chunks(
    pending: &[PendingChunk],
    language: &LanguageCode,
    tokenizer: &Tokenizer,
    options: ExtractOptions,
) -> Result<Vec<Vec<PositionedToken>>, ExtractionError> {
    let tokenize = |chunk: &PendingChunk| {
        tokenizer.tokenize_with_offsets(&chunk.content.text, language)
    };
    let results = if options.parallel {
        map_parallel(pending, tokenize)
    } else {
        pending.iter().map(tokenize).collect()
    };
    results
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(ExtractionError::from)
}

#[cfg(feature = "parallel")]
fn map_parallel<T, F>(pending: &[PendingChunk], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&PendingChunk) -> T + Sync + Send,
{
    pending.par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_parallel<T, F>(pending: &[PendingChunk], f: F) -> Vec<T>
where
    F: Fn(&PendingChunk) -> T,
{
    pending.iter().map(f).collect()
}

/// Concatenate per-chunk token streams in spine order, renumbering
/// ordinals and closing every non-empty chunk with a paragraph break.
fn merge_chunks(
    pending: &[PendingChunk],
    tokenized: Vec<Vec<PositionedToken>>,
) -> (Vec<Token>, Vec<ChunkDescriptor>) {
    let mut tokens = Vec::new();
    let mut chunks = Vec::with_capacity(pending.len());

    for (chunk, mut positioned) in pending.iter().zip(tokenized) {
        let ends_with_break = positioned
            .last()
            .is_none_or(|p| p.token.is_paragraph_break());
        if !ends_with_break {
            positioned.push(PositionedToken {
                offset: chunk.content.text.len(),
                token: Token::new(0, TokenKind::ParagraphBreak, "\n"),
            });
        }

        let mut anchors = HashMap::new();
        for (id, byte_offset) in &chunk.content.anchors {
            let local = positioned.partition_point(|p| p.offset < *byte_offset) as u64;
            anchors.entry(id.clone()).or_insert(local);
        }

        let word_count = positioned.iter().filter(|p| p.token.is_word()).count() as u32;
        let token_count = positioned.len() as u64;
        for p in positioned {
            let ordinal = tokens.len() as u64;
            tokens.push(Token::new(ordinal, p.token.kind, p.token.text));
        }

        debug!(
            "Chunk {} at spine position {}: {word_count} words, {token_count} tokens",
            chunk.item.id, chunk.position
        );
        chunks.push(ChunkDescriptor {
            id: chunk.item.id.clone(),
            source_href: chunk.item.href.clone(),
            word_count,
            token_count,
            anchors,
            ..Default::default()
        });
    }
    (tokens, chunks)
}

fn read_navigation<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    source: NavigationSource,
) -> Result<Option<SectionNode>, ExtractionError> {
    let (item, is_ncx) = match source {
        NavigationSource::Ncx(item) => (item, true),
        NavigationSource::NavDocument(item) => (item, false),
    };
    let Some(bytes) = read_entry(archive, &item.href)? else {
        warn!("Navigation document {} is missing from the archive", item.href);
        return Ok(None);
    };
    let xml = String::from_utf8_lossy(&bytes);
    Ok(if is_ncx {
        toc::parse_ncx(&xml, &item.href)
    } else {
        toc::parse_nav_document(&xml, &item.href)
    })
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, ExtractionError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    // The declared size comes from the archive and may be anything.
    let mut data = Vec::with_capacity(file.size().min(MAX_PREALLOCATION) as usize);
    file.read_to_end(&mut data)?;
    Ok(Some(data))
}
