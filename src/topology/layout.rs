use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::constants::DATA_DIR;
use crate::constants::EDIT_LOG_FILE;
use crate::constants::HOME_DIR_PREFIX;
use crate::constants::HOME_DIR_SUFFIX;
use crate::constants::IMAGE_FILE;
use crate::constants::JOURNAL_DIR;
use crate::constants::LOGS_DIR;
use crate::constants::RAMDISK_DIR;
use crate::constants::UNDERFS_DIR;
use crate::ProvisioningError;

/// Directory tree owned by one cluster instance.
///
/// ```text
/// <home>/journal/<replica>/   edit log and snapshot image
/// <home>/data/
/// <home>/logs/
/// <home>/underfs/
/// <home>/ramdisk/             worker data folder
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemLayout {
    home: PathBuf,
    masters: usize,
}

impl FilesystemLayout {
    pub fn new(
        home: impl Into<PathBuf>,
        masters: usize,
    ) -> Self {
        Self {
            home: home.into(),
            masters,
        }
    }

    /// A fresh, collision-free home under the system temp directory.
    pub fn unique_home() -> PathBuf {
        std::env::temp_dir().join(format!(
            "{}{}{}",
            HOME_DIR_PREFIX,
            nanoid::nanoid!(10, &nanoid::alphabet::SAFE),
            HOME_DIR_SUFFIX
        ))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn journal(&self) -> PathBuf {
        self.home.join(JOURNAL_DIR)
    }

    /// Journal folder of one replica
    pub fn replica_journal(
        &self,
        index: usize,
    ) -> PathBuf {
        self.journal().join(index.to_string())
    }

    pub fn data(&self) -> PathBuf {
        self.home.join(DATA_DIR)
    }

    pub fn logs(&self) -> PathBuf {
        self.home.join(LOGS_DIR)
    }

    pub fn underfs(&self) -> PathBuf {
        self.home.join(UNDERFS_DIR)
    }

    pub fn ramdisk(&self) -> PathBuf {
        self.home.join(RAMDISK_DIR)
    }

    /// Edit log of the first journal
    pub fn edit_log_path(&self) -> PathBuf {
        self.replica_journal(0).join(EDIT_LOG_FILE)
    }

    /// Snapshot image of the first journal
    pub fn image_path(&self) -> PathBuf {
        self.replica_journal(0).join(IMAGE_FILE)
    }

    /// Every directory in creation order, parents first.
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.home.clone(), self.journal()];
        dirs.extend((0..self.masters).map(|i| self.replica_journal(i)));
        dirs.extend([self.data(), self.logs(), self.underfs(), self.ramdisk()]);
        dirs
    }
}

/// Creates the directory tree of a [`FilesystemLayout`].
pub struct DirectoryProvisioner;

impl DirectoryProvisioner {
    /// Creates every directory of `layout`, stopping at the first failure.
    ///
    /// The home directory must not exist yet. Nothing is cleaned up on failure; the
    /// caller discards the whole tree.
    pub fn provision(layout: &FilesystemLayout) -> std::result::Result<(), ProvisioningError> {
        if let Some(parent) = layout.home().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| ProvisioningError {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        for dir in layout.directories() {
            Self::mkdir(&dir)?;
        }
        Ok(())
    }

    pub(crate) fn mkdir(path: &Path) -> std::result::Result<(), ProvisioningError> {
        fs::create_dir(path).map_err(|source| ProvisioningError {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("created {}", path.display());
        Ok(())
    }
}
