use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use log::{debug, info, warn};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::profile::{ProfileError, ProjectAnalyzer, Result, SecurityProfile, StackAnalyzer};

/// A loaded profile and the on-disk state it was read from.
#[derive(Debug)]
pub struct ProfileCacheEntry {
    pub profile: Arc<SecurityProfile>,
    pub file_mtime: SystemTime,
    pub file_hash: String,
}

/// Per-project profile cache, revalidated against the profile file on every lookup.
///
/// A lookup costs one `stat` when the file is unchanged. A changed mtime
/// costs one read and hash; if the content is the same only the stored
/// mtime moves. Entries are replaced whole, never edited in place.
pub struct ProfileCache {
    analyzer: Box<dyn ProjectAnalyzer>,
    profile_filename: String,
    entries: RwLock<HashMap<PathBuf, Arc<ProfileCacheEntry>>>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

impl ProfileCache {
    pub fn new(
        analyzer: impl ProjectAnalyzer + 'static,
        profile_filename: impl Into<String>,
    ) -> Self {
        Self {
            analyzer: Box::new(analyzer),
            profile_filename: profile_filename.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            StackAnalyzer::from_config(config),
            config.settings.profile_filename.clone(),
        )
    }

    fn key(project_dir: &Path) -> PathBuf {
        project_dir
            .canonicalize()
            .unwrap_or_else(|_| project_dir.to_path_buf())
    }

    fn cached(&self, key: &Path) -> Option<Arc<ProfileCacheEntry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn store(&self, key: PathBuf, entry: ProfileCacheEntry) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(entry));
    }

    /// The profile for `project_dir`, loading, reloading or generating it as needed.
    pub fn get_or_load(&self, project_dir: &Path) -> Result<Arc<SecurityProfile>> {
        let key = Self::key(project_dir);
        let path = key.join(&self.profile_filename);
        let unreadable = |source: io::Error| ProfileError::Unreadable {
            path: path.clone(),
            source,
        };

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.invalidate(&key);
                return self.create(key, &path);
            }
            Err(e) => return Err(unreadable(e)),
        };
        let mtime = metadata.modified().map_err(unreadable)?;

        let cached = self.cached(&key);
        if let Some(entry) = &cached
            && entry.file_mtime == mtime
        {
            return Ok(Arc::clone(&entry.profile));
        }

        let bytes = fs::read(&path).map_err(unreadable)?;
        let file_hash = sha256_hex(&bytes);

        if let Some(entry) = cached
            && entry.file_hash == file_hash
        {
            debug!("{}: mtime changed, content unchanged", path.display());
            let profile = Arc::clone(&entry.profile);
            self.store(
                key,
                ProfileCacheEntry {
                    profile: Arc::clone(&profile),
                    file_mtime: mtime,
                    file_hash,
                },
            );
            return Ok(profile);
        }

        match serde_json::from_slice::<SecurityProfile>(&bytes) {
            Ok(profile) if !self.analyzer.is_outdated(&profile, &key) => {
                debug!("{}: loaded", path.display());
                let profile = Arc::new(profile);
                self.store(
                    key,
                    ProfileCacheEntry {
                        profile: Arc::clone(&profile),
                        file_mtime: mtime,
                        file_hash,
                    },
                );
                Ok(profile)
            }
            Ok(_) => {
                info!("{}: project changed, re-analyzing", path.display());
                self.create(key, &path)
            }
            Err(e) => {
                warn!("{}: corrupt profile ({e}), re-analyzing", path.display());
                self.create(key, &path)
            }
        }
    }

    /// Analyze the project, persist the result and cache it.
    fn create(&self, key: PathBuf, path: &Path) -> Result<Arc<SecurityProfile>> {
        let profile = Arc::new(self.analyzer.analyze(&key)?);
        info!("created security profile for {}", key.display());

        if let Err(e) = profile.save(path) {
            warn!("{e}; using the new profile without caching it");
            return Ok(profile);
        }
        let written = fs::metadata(path)
            .and_then(|m| m.modified())
            .and_then(|mtime| Ok((mtime, fs::read(path)?)));
        match written {
            Ok((file_mtime, bytes)) => self.store(
                key,
                ProfileCacheEntry {
                    profile: Arc::clone(&profile),
                    file_mtime,
                    file_hash: sha256_hex(&bytes),
                },
            ),
            Err(e) => warn!("{}: saved but cannot stat ({e})", path.display()),
        }
        Ok(profile)
    }

    /// Drop the entry for one project.
    pub fn invalidate(&self, project_dir: &Path) {
        let key = Self::key(project_dir);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }

    /// Drop every entry.
    pub fn clear_all(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
