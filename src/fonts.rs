// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Font resolution for the `text` primitive
//!
//! The runtime only needs a path to a font file for a family name.
//! [`FontCache`] looks the family up in a local directory; populating that
//! directory (downloading, system font discovery) is up to the host.

use crate::config::FontSettings;
use ahash::AHashMap;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("no font file for family `{family}` in {}", dir.display())]
    NotFound { family: String, dir: PathBuf },

    #[error("failed to scan font directory: {0}")]
    Scan(#[from] walkdir::Error),
}

/// Maps a font family name to a local font file
pub trait FontResolver {
    fn resolve(&self, family: &str) -> Result<PathBuf, FontError>;
}

/// Directory-backed resolver with an in-memory memo of past lookups
#[derive(Debug)]
pub struct FontCache {
    dir: PathBuf,
    resolved: RefCell<AHashMap<String, PathBuf>>,
}

impl FontCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            resolved: RefCell::new(AHashMap::new()),
        }
    }

    pub fn from_settings(settings: &FontSettings) -> Self {
        Self::new(settings.cache_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn scan(&self, family: &str) -> Result<PathBuf, FontError> {
        let wanted = normalize(family);
        let mut candidates = Vec::new();

        if self.dir.is_dir() {
            for entry in WalkDir::new(&self.dir).follow_links(true) {
                let entry = entry?;
                let path = entry.path();
                if !entry.file_type().is_file() || !is_font_file(path) {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let stem = normalize(stem);
                // Exact family first, then its regular face, then any face
                let rank = if stem == wanted {
                    0
                } else if stem == format!("{}regular", wanted) {
                    1
                } else if stem.starts_with(&wanted) {
                    2
                } else {
                    continue;
                };
                candidates.push((rank, path.to_path_buf()));
            }
        }

        candidates.sort();
        candidates
            .into_iter()
            .next()
            .map(|(_, path)| path)
            .ok_or_else(|| FontError::NotFound {
                family: family.to_string(),
                dir: self.dir.clone(),
            })
    }
}

impl FontResolver for FontCache {
    fn resolve(&self, family: &str) -> Result<PathBuf, FontError> {
        if let Some(path) = self.resolved.borrow().get(family) {
            return Ok(path.clone());
        }
        let path = self.scan(family)?;
        debug!(family, path = %path.display(), "resolved font");
        self.resolved
            .borrow_mut()
            .insert(family.to_string(), path.clone());
        Ok(path)
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf"))
        .unwrap_or(false)
}

/// Lowercase, without spaces, dashes or underscores
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}
