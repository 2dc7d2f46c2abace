//! Annotations the controller has rendered, kept for synchronous hover lookups.

use crate::blame::AnnotationSource;
use crate::document::{Document, Workspace};
use crate::render::{AnnotationLookup, RemoteInfoLookup};
use crate::types::{AnnotationMap, AnnotationRecord, CacheKey, RemoteInfo};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Last annotation map rendered per cache key.
pub struct VisibleAnnotations {
    workspace: Workspace,
    source: Arc<AnnotationSource>,
    maps: Mutex<HashMap<CacheKey, Arc<AnnotationMap>>>,
}

impl VisibleAnnotations {
    pub fn new(workspace: Workspace, source: Arc<AnnotationSource>) -> Self {
        Self {
            workspace,
            source,
            maps: Mutex::new(HashMap::new()),
        }
    }

    fn maps(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<AnnotationMap>>> {
        self.maps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store(&self, key: CacheKey, map: Arc<AnnotationMap>) {
        self.maps().insert(key, map);
    }

    /// Keep only the maps whose key is in `keys`.
    pub fn retain(&self, keys: &HashSet<CacheKey>) {
        self.maps().retain(|key, _| keys.contains(key));
    }

    pub fn len(&self) -> usize {
        self.maps().len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps().is_empty()
    }

    pub fn remove(&self, key: &CacheKey) {
        self.maps().remove(key);
    }

    pub fn clear(&self) {
        self.maps().clear();
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<AnnotationMap>> {
        self.maps().get(key).cloned()
    }
}

impl AnnotationLookup for VisibleAnnotations {
    fn annotation(&self, document: &Document, line_number: u32) -> Option<AnnotationRecord> {
        let info = self.workspace.resolve(document)?;
        self.get(&info.cache_key)?.get(line_number).cloned()
    }

    fn location(&self, document: &Document) -> Option<(PathBuf, String)> {
        let info = self.workspace.resolve(document)?;
        Some((info.repo_path, info.file_path))
    }
}

impl RemoteInfoLookup for VisibleAnnotations {
    fn remote_info(&self, document: &Document) -> Option<RemoteInfo> {
        let info = self.workspace.resolve(document)?;
        self.source.cached_remote_info(&info.repo_path)
    }
}
