//! On-disk document store.
//!
//! A directory of `<id>.jpg` + `<id>.xml` pairs. Ids are Unix timestamps
//! taken at import time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::constants::{IMAGE_EXTENSION, XML_EXTENSION};
use crate::document::{Document, DocumentError, Repair};
use crate::geometry;

/// A listed document pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    pub id: String,
    /// Document title, or the id when the title is empty or unreadable
    pub title: String,
    pub image_path: PathBuf,
    pub xml_path: PathBuf,
}

impl DocumentEntry {
    /// Key used to order the document list.
    pub fn sort_key(&self) -> String {
        format!("{}-{}", self.title, self.id)
    }
}

/// Directory of photo/annotation pairs.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Use `dir` as the store without touching the filesystem.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Use `dir` as the store, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir)?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn image_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, IMAGE_EXTENSION))
    }

    pub fn xml_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, XML_EXTENSION))
    }

    fn check_id(id: &str) -> Result<(), DocumentError> {
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(DocumentError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    /// Import a photo and create its blank annotation file. Returns the id.
    pub fn create(&self, image_bytes: &[u8]) -> Result<String, DocumentError> {
        self.create_at(chrono::Utc::now().timestamp(), image_bytes)
    }

    /// Like [`DocumentStore::create`] with an explicit timestamp. The id is
    /// bumped by one second until it is free.
    pub fn create_at(&self, timestamp: i64, image_bytes: &[u8]) -> Result<String, DocumentError> {
        let mut stamp = timestamp;
        let id = loop {
            let id = stamp.to_string();
            if !self.image_path(&id).exists() && !self.xml_path(&id).exists() {
                break id;
            }
            stamp += 1;
        };

        let image_path = self.image_path(&id);
        fs::write(&image_path, image_bytes).map_err(|source| DocumentError::Persistence {
            path: image_path.clone(),
            source,
        })?;
        if let Err(e) = self.save(&id, &Document::blank()) {
            // Leave no orphan photo behind
            let _ = fs::remove_file(&image_path);
            return Err(e);
        }

        log::info!("Created document {}", id);
        Ok(id)
    }

    /// Ids with a given extension, unsorted.
    fn ids_with_extension(&self, extension: &str) -> Result<Vec<String>, DocumentError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if let (true, Some(stem)) = (matches, path.file_stem().and_then(|s| s.to_str())) {
                ids.push(stem.to_string());
            }
        }
        Ok(ids)
    }

    /// Ids of every annotation file, sorted.
    pub fn ids(&self) -> Result<Vec<String>, DocumentError> {
        let mut ids = self.ids_with_extension(XML_EXTENSION)?;
        ids.sort();
        Ok(ids)
    }

    /// Complete pairs ordered by `"<title>-<id>"`.
    pub fn list(&self) -> Result<Vec<DocumentEntry>, DocumentError> {
        let mut entries = Vec::new();
        for id in self.ids_with_extension(IMAGE_EXTENSION)? {
            let xml_path = self.xml_path(&id);
            if !xml_path.exists() {
                continue;
            }
            let title = match self.load(&id) {
                Ok(doc) if !doc.title.is_empty() => doc.title,
                Ok(_) => id.clone(),
                Err(e) => {
                    log::warn!("Could not read title of document {}: {}", id, e);
                    id.clone()
                }
            };
            entries.push(DocumentEntry {
                image_path: self.image_path(&id),
                xml_path,
                title,
                id,
            });
        }
        entries.sort_by_key(DocumentEntry::sort_key);
        Ok(entries)
    }

    /// Photos without an annotation file.
    pub fn orphans(&self) -> Result<Vec<String>, DocumentError> {
        let mut orphans: Vec<_> = self
            .ids_with_extension(IMAGE_EXTENSION)?
            .into_iter()
            .filter(|id| !self.xml_path(id).exists())
            .collect();
        orphans.sort();
        Ok(orphans)
    }

    /// Delete orphan photos, returning how many were removed.
    pub fn prune_orphans(&self) -> Result<usize, DocumentError> {
        let orphans = self.orphans()?;
        for id in &orphans {
            fs::remove_file(self.image_path(id))?;
            log::info!("Removed orphan photo {}", id);
        }
        Ok(orphans.len())
    }

    /// Load and normalize a document.
    pub fn load(&self, id: &str) -> Result<Document, DocumentError> {
        self.load_with_repairs(id).map(|(doc, _)| doc)
    }

    /// Load a document, also returning the repairs that normalization made.
    pub fn load_with_repairs(&self, id: &str) -> Result<(Document, Vec<Repair>), DocumentError> {
        Self::check_id(id)?;
        let path = self.xml_path(id);
        let xml = fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => DocumentError::NotFound { id: id.to_string() },
            _ => DocumentError::Load {
                path: path.clone(),
                source,
            },
        })?;
        let (doc, repairs) = Document::from_xml_str_with_repairs(&xml)?;
        log::debug!("Loaded document {} ({} repairs)", id, repairs.len());
        Ok((doc, repairs))
    }

    /// Write a document atomically: a temporary file is written next to the
    /// target and renamed over it.
    pub fn save(&self, id: &str, document: &Document) -> Result<(), DocumentError> {
        Self::check_id(id)?;
        let xml = document.to_xml_string()?;
        let path = self.xml_path(id);
        let tmp_path = self.dir.join(format!(".{}.{}.tmp", id, XML_EXTENSION));

        let persistence = |source: io::Error| DocumentError::Persistence {
            path: path.clone(),
            source,
        };
        if let Err(e) = fs::write(&tmp_path, xml) {
            return Err(persistence(e));
        }
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(persistence(e));
        }

        log::info!("Saved document {} ({} regions)", id, document.region_count());
        Ok(())
    }

    /// Delete both files of a document.
    pub fn delete(&self, id: &str) -> Result<(), DocumentError> {
        Self::check_id(id)?;
        let mut removed = false;
        for path in [self.xml_path(id), self.image_path(id)] {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        if !removed {
            return Err(DocumentError::NotFound { id: id.to_string() });
        }
        log::info!("Deleted document {}", id);
        Ok(())
    }

    /// Pixel size of a document's photo.
    pub fn image_dimensions(&self, id: &str) -> Result<(u32, u32), DocumentError> {
        Self::check_id(id)?;
        Ok(image::image_dimensions(self.image_path(id))?)
    }

    /// Scale that fits the photo into `available` (view units).
    pub fn display_scale(&self, id: &str, available: (f32, f32)) -> Result<f32, DocumentError> {
        let (width, height) = self.image_dimensions(id)?;
        Ok(geometry::fit_scale((width as f32, height as f32), available))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Region;

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Jpeg).unwrap();
        bytes.into_inner()
    }

    fn titled(store: &DocumentStore, id: &str, title: &str) {
        let mut doc = store.load(id).unwrap();
        doc.title = title.to_string();
        store.save(id, &doc).unwrap();
    }

    #[test]
    fn test_create_bumps_colliding_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        let first = store.create_at(1_700_000_000, &jpeg_bytes(4, 4)).unwrap();
        let second = store.create_at(1_700_000_000, &jpeg_bytes(4, 4)).unwrap();
        assert_eq!(first, "1700000000");
        assert_eq!(second, "1700000001");

        let doc = store.load(&second).unwrap();
        assert_eq!(doc, Document::blank());
    }

    #[test]
    fn test_list_sorted_by_title_and_skips_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let a = store.create_at(100, &jpeg_bytes(2, 2)).unwrap();
        let b = store.create_at(200, &jpeg_bytes(2, 2)).unwrap();
        let c = store.create_at(300, &jpeg_bytes(2, 2)).unwrap();
        titled(&store, &a, "Zebra");
        titled(&store, &b, "Apple");
        fs::write(store.image_path("400"), jpeg_bytes(2, 2)).unwrap();

        let listed: Vec<_> = store.list().unwrap().into_iter().map(|e| e.title).collect();
        // Untitled documents are listed under their id
        assert_eq!(listed, vec![c.clone(), "Apple".to_string(), "Zebra".to_string()]);

        assert_eq!(store.orphans().unwrap(), vec!["400".to_string()]);
        assert_eq!(store.prune_orphans().unwrap(), 1);
        assert!(store.orphans().unwrap().is_empty());
        assert_eq!(store.ids().unwrap(), vec![a, b, c]);
    }

    #[test]
    fn test_save_load_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let id = store.create_at(1_000, &jpeg_bytes(8, 8)).unwrap();

        let mut doc = store.load(&id).unwrap();
        doc.insert_region(Region::rectangle(doc.next_tag().unwrap()));
        store.save(&id, &doc).unwrap();
        assert_eq!(store.load(&id).unwrap(), doc);

        // No temporary files are left behind
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 2);

        store.delete(&id).unwrap();
        assert!(matches!(store.load(&id), Err(DocumentError::NotFound { .. })));
        assert!(matches!(store.delete(&id), Err(DocumentError::NotFound { .. })));
    }

    #[test]
    fn test_load_repairs_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        fs::write(store.xml_path("42"), "<xia><author>Jane</author></xia>").unwrap();

        let (doc, repairs) = store.load_with_repairs("42").unwrap();
        assert_eq!(doc.creator, "Jane");
        assert!(repairs.contains(&Repair::MigratedAuthor));

        fs::write(store.xml_path("43"), "<xia><title>").unwrap();
        assert!(store.load("43").is_err());
        assert!(matches!(store.load("../etc"), Err(DocumentError::NotFound { .. })));
    }

    #[test]
    fn test_display_scale() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let id = store.create_at(5, &jpeg_bytes(400, 200)).unwrap();

        assert_eq!(store.image_dimensions(&id).unwrap(), (400, 200));
        assert_eq!(store.display_scale(&id, (200.0, 200.0)).unwrap(), 0.5);
        assert_eq!(store.display_scale(&id, (1600.0, 400.0)).unwrap(), 2.0);
        assert!(store.display_scale("missing", (10.0, 10.0)).is_err());
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("gone"));
        assert!(matches!(
            store.save("1", &Document::blank()),
            Err(DocumentError::Persistence { .. })
        ));
        assert!(DocumentStore::open(dir.path().join("made")).is_ok());
    }
}
