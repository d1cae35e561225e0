// catalog.rs
//
// Copyright (c) 2025  Douglas Lau
//
//! Catalogs of animation files
use crate::error::{Error, Result};
use crate::stream::{FileStream, MemoryStream, Stream};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Check if a file name is an animation file.
///
/// Hidden (`.`), temporary (`~`) and disabled (`_`) files are skipped.
pub fn is_animation_file(name: &str) -> bool {
    if name.starts_with(&['_', '~', '.'][..]) {
        return false;
    }
    name.to_ascii_uppercase().ends_with(".GIF")
}

/// List animation files in a directory, sorted by name
pub fn list_animation_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = vec![];
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if is_animation_file(name) => files.push(path),
            _ => debug!("skipping {:?}", path),
        }
    }
    files.sort();
    Ok(files)
}

/// Indexed collection of animations
pub trait Catalog {
    /// Get the number of animations
    fn len(&self) -> usize;

    /// Check if the catalog is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the name of one animation
    fn name(&self, index: usize) -> Option<&str>;

    /// Open one animation
    fn open(&self, index: usize) -> Result<Box<dyn Stream>>;
}

/// Animation files in a directory
#[derive(Debug)]
pub struct Directory {
    /// Sorted file paths
    files: Vec<PathBuf>,
    /// File names, for display
    names: Vec<String>,
}

impl Directory {
    /// Scan a directory for animation files
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let files = list_animation_files(dir)?;
        if files.is_empty() {
            return Err(Error::NoAnimationFiles);
        }
        let names = files
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect();
        Ok(Directory { files, names })
    }

    /// Get the file paths
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Open one file by index
    pub fn open_by_index(&self, index: usize) -> Result<FileStream> {
        let path = self
            .files
            .get(index)
            .ok_or(Error::InvalidFileIndex(index))?;
        FileStream::open(path)
    }
}

impl Catalog for Directory {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    fn open(&self, index: usize) -> Result<Box<dyn Stream>> {
        Ok(Box::new(self.open_by_index(index)?))
    }
}

/// Animations embedded in memory
#[derive(Clone, Debug, Default)]
pub struct Embedded {
    entries: Vec<(String, Arc<[u8]>)>,
}

impl Embedded {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one animation
    pub fn with_animation<N, B>(mut self, name: N, data: B) -> Self
    where
        N: Into<String>,
        B: Into<Arc<[u8]>>,
    {
        self.entries.push((name.into(), data.into()));
        self
    }
}

impl Catalog for Embedded {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn name(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(name, _)| name.as_str())
    }

    fn open(&self, index: usize) -> Result<Box<dyn Stream>> {
        let (_, data) = self
            .entries
            .get(index)
            .ok_or(Error::InvalidFileIndex(index))?;
        Ok(Box::new(MemoryStream::new(Arc::clone(data))))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs::File;

    #[test]
    fn animation_names() {
        assert!(is_animation_file("cat.gif"));
        assert!(is_animation_file("CAT.GIF"));
        assert!(is_animation_file("a.GiF"));
        assert!(!is_animation_file("_cat.gif"));
        assert!(!is_animation_file("~cat.gif"));
        assert!(!is_animation_file(".cat.gif"));
        assert!(!is_animation_file("cat.png"));
        assert!(!is_animation_file("gif"));
    }

    #[test]
    fn directory() -> Result<()> {
        let dir = std::env::temp_dir()
            .join(format!("marquee-catalog-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        for name in ["b.gif", "a.GIF", "_c.gif", "d.txt"] {
            File::create(dir.join(name))?;
        }
        let cat = Directory::new(&dir)?;
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.name(0), Some("a.GIF"));
        assert_eq!(cat.name(1), Some("b.gif"));
        assert_eq!(cat.files()[0], dir.join("a.GIF"));
        assert!(cat.open(1).is_ok());
        assert!(matches!(cat.open(2), Err(Error::InvalidFileIndex(2))));
        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn empty_directory() -> Result<()> {
        let dir = std::env::temp_dir()
            .join(format!("marquee-empty-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        let err = Directory::new(&dir).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
        fs::remove_dir_all(&dir)?;
        let err = Directory::new(&dir).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        Ok(())
    }

    #[test]
    fn embedded() -> Result<()> {
        let cat = Embedded::new()
            .with_animation("one", &b"GIF89a"[..])
            .with_animation("two", vec![1u8, 2, 3]);
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.name(1), Some("two"));
        let mut s = cat.open(1)?;
        assert_eq!(s.size()?, 3);
        assert!(cat.open(2).is_err());
        Ok(())
    }
}
