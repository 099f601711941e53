use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use lopdf::{Bookmark, Dictionary, Document, Object, ObjectId};

use crate::model::{OutlineEl, OutlineItem};
use crate::outline::OutlineSink;

const MAX_OUTLINE_DEPTH: usize = 64;
const MAX_SIBLINGS: usize = 10_000;

/// A loaded PDF document: page lookup, native outline decoding, and the
/// outline writer boundary.
pub struct PdfDocument {
    doc: Document,
    /// Page object ids by 0-based page index.
    page_ids: Vec<ObjectId>,
    /// Reverse lookup, page object id to 1-based page number.
    page_numbers: HashMap<ObjectId, u32>,
    path: PathBuf,
    warnings: Vec<String>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        Self::from_document(doc, path.to_path_buf())
    }

    fn from_document(doc: Document, path: PathBuf) -> Result<Self> {
        let pages_map = doc.get_pages();
        let page_ids: Vec<ObjectId> = pages_map.values().copied().collect();
        if page_ids.is_empty() {
            bail!("document has no pages: {}", path.display());
        }
        let page_numbers = pages_map.iter().map(|(number, id)| (*id, *number)).collect();

        Ok(Self {
            doc,
            page_ids,
            page_numbers,
            path,
            warnings: Vec::new(),
        })
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Decodes the document's `/Outlines` tree into the interleaved tagged
    /// form: each item is followed by a `Children` element when it has any.
    /// Unresolvable destinations become `page: None`; a broken node ends its
    /// sibling run without failing the walk.
    pub fn read_outline(&self) -> Vec<OutlineEl> {
        let Some(first) = self.outline_first_id() else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        self.read_outline_level(first, 0, &mut visited)
    }

    fn outline_first_id(&self) -> Option<ObjectId> {
        let root = self.doc.trailer.get(b"Root").ok()?;
        let catalog = self.resolve(root).as_dict().ok()?;
        let outlines = catalog.get(b"Outlines").ok()?;
        let outlines = self.resolve(outlines).as_dict().ok()?;
        match outlines.get(b"First") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    }

    fn read_outline_level(
        &self,
        first: ObjectId,
        depth: usize,
        visited: &mut HashSet<ObjectId>,
    ) -> Vec<OutlineEl> {
        let mut els = Vec::new();
        if depth >= MAX_OUTLINE_DEPTH {
            return els;
        }

        let mut current = Some(first);
        let mut siblings = 0_usize;

        while let Some(node_id) = current {
            // Guards against cyclic or degenerate outline graphs.
            if !visited.insert(node_id) || siblings >= MAX_SIBLINGS {
                break;
            }
            siblings += 1;

            let Ok(node) = self.doc.get_object(node_id).and_then(Object::as_dict) else {
                break;
            };

            let title = node
                .get(b"Title")
                .ok()
                .map(|object| self.resolve(object))
                .and_then(|object| match object {
                    Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
                    _ => None,
                })
                .unwrap_or_else(|| "Untitled".to_string());

            els.push(OutlineEl::Item(OutlineItem {
                title,
                page: self.resolve_dest_page(node),
            }));

            if let Ok(Object::Reference(child)) = node.get(b"First") {
                let children = self.read_outline_level(*child, depth + 1, visited);
                if !children.is_empty() {
                    els.push(OutlineEl::Children(children));
                }
            }

            current = match node.get(b"Next") {
                Ok(Object::Reference(next)) => Some(*next),
                _ => None,
            };
        }

        els
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(object),
            _ => object,
        }
    }

    /// `/Dest` first, then `/A` GoTo actions. Named destinations are not
    /// chased; the caller renders a placeholder instead.
    fn resolve_dest_page(&self, node: &Dictionary) -> Option<u32> {
        if let Ok(dest) = node.get(b"Dest") {
            if let Some(page) = self.dest_to_page(dest) {
                return Some(page);
            }
        }

        if let Ok(action) = node.get(b"A") {
            if let Ok(action) = self.resolve(action).as_dict() {
                let is_goto = matches!(
                    action.get(b"S"),
                    Ok(Object::Name(name)) if name.as_slice() == b"GoTo"
                );
                if is_goto {
                    if let Ok(dest) = action.get(b"D") {
                        if let Some(page) = self.dest_to_page(dest) {
                            return Some(page);
                        }
                    }
                }
            }
        }

        None
    }

    fn dest_to_page(&self, dest: &Object) -> Option<u32> {
        match self.resolve(dest) {
            Object::Array(parts) => parts
                .first()
                .and_then(|target| target.as_reference().ok())
                .and_then(|id| self.page_numbers.get(&id).copied()),
            _ => None,
        }
    }

    /// Builds the outline dictionary tree from the bookmarks added through
    /// [`OutlineSink`], replaces any existing `/Outlines` root in the
    /// catalog, and writes the document to `out_path`.
    pub fn save_with_outline(&mut self, out_path: &Path) -> Result<()> {
        if let Some(outline_id) = self.doc.build_outline() {
            let root_id = self
                .doc
                .trailer
                .get(b"Root")
                .and_then(Object::as_reference)
                .with_context(|| format!("document catalog is missing: {}", self.path.display()))?;
            let catalog = self
                .doc
                .get_object_mut(root_id)
                .with_context(|| format!("failed to access catalog: {}", self.path.display()))?;
            if let Object::Dictionary(dict) = catalog {
                dict.set("Outlines", Object::Reference(outline_id));
            }
        }

        self.doc
            .save(out_path)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        Ok(())
    }
}

impl OutlineSink for PdfDocument {
    type Handle = u32;

    fn add_outline_item(
        &mut self,
        title: &str,
        page_index: u32,
        parent: Option<u32>,
    ) -> Result<u32> {
        let last = self.page_ids.len() - 1;
        let index = (page_index as usize).min(last);
        if index != page_index as usize {
            self.warnings.push(format!(
                "bookmark '{title}' targets page {} beyond the last page {}; clamped",
                page_index + 1,
                last + 1
            ));
        }

        let page_id = self.page_ids[index];
        let bookmark = Bookmark::new(title.to_string(), [0.0, 0.0, 0.0], 0, page_id);
        Ok(self.doc.add_bookmark(bookmark, parent))
    }
}

fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let utf16 = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect::<Vec<u16>>();
        String::from_utf16_lossy(&utf16)
    } else {
        // PDFDocEncoding is close enough to Latin-1 for titles.
        bytes.iter().map(|&byte| byte as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use lopdf::{StringFormat, dictionary};

    use super::*;

    /// Two blank pages, no outline.
    fn two_page_document() -> (Document, ObjectId, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page1_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        let page2_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => 2,
                "Kids" => vec![page1_id.into(), page2_id.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        (doc, page1_id, catalog_id)
    }

    fn pdf_string(text: &str) -> Object {
        Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
    }

    #[test]
    fn decode_pdf_string_handles_utf16be_marker() {
        let bytes = [0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42];
        assert_eq!(decode_pdf_string(&bytes), "AB");
    }

    #[test]
    fn decode_pdf_string_falls_back_to_latin1() {
        let bytes = b"Caf\xe9";
        assert_eq!(decode_pdf_string(bytes), "Café");
    }

    #[test]
    fn read_outline_is_empty_without_outline_root() {
        let (doc, _, _) = two_page_document();
        let doc = PdfDocument::from_document(doc, PathBuf::from("test.pdf")).unwrap();
        assert!(doc.read_outline().is_empty());
    }

    #[test]
    fn read_outline_decodes_siblings_and_children_interleaved() {
        let (mut doc, page1_id, catalog_id) = two_page_document();

        let child_id = doc.add_object(dictionary! {
            "Title" => pdf_string("Section 1.1"),
        });
        let first_id = doc.add_object(dictionary! {
            "Title" => pdf_string("Chapter 1"),
            "Dest" => vec![page1_id.into(), "XYZ".into()],
            "First" => child_id,
            "Last" => child_id,
        });
        let outlines_id = doc.add_object(dictionary! {
            "Type" => "Outlines",
            "First" => first_id,
            "Last" => first_id,
        });
        if let Ok(Object::Dictionary(catalog)) = doc.get_object_mut(catalog_id) {
            catalog.set("Outlines", Object::Reference(outlines_id));
        }

        let doc = PdfDocument::from_document(doc, PathBuf::from("test.pdf")).unwrap();
        let els = doc.read_outline();

        assert_eq!(els.len(), 2);
        assert_eq!(
            els[0],
            OutlineEl::Item(OutlineItem {
                title: "Chapter 1".to_string(),
                page: Some(1),
            })
        );
        // The child with no destination flattens to a placeholder page.
        assert_eq!(
            els[1],
            OutlineEl::Children(vec![OutlineEl::Item(OutlineItem {
                title: "Section 1.1".to_string(),
                page: None,
            })])
        );
    }

    #[test]
    fn add_outline_item_clamps_pages_past_the_end() {
        let (doc, _, _) = two_page_document();
        let mut doc = PdfDocument::from_document(doc, PathBuf::from("test.pdf")).unwrap();

        let parent = doc.add_outline_item("Chapter 1", 0, None).unwrap();
        let child = doc.add_outline_item("Way past", 9, Some(parent)).unwrap();
        assert_ne!(parent, child);

        let warnings = doc.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Way past"));
        assert!(doc.take_warnings().is_empty());
    }
}
