//! Locating data files on disk.
//!
//! Search order for a file name:
//!
//! 1. the caller's directory hint,
//! 2. the directory holding the running executable,
//! 3. the per-user data directory,
//! 4. the system install locations (Linux/OpenBSD only by default).
//!
//! Only existing regular files count.

use std::path::{Path, PathBuf};

use log::debug;

#[cfg(any(target_os = "linux", target_os = "openbsd"))]
const SYSTEM_DIRS: &[&str] = &[
    "/usr/local/share/games/imdoom64/",
    "/usr/local/share/imdoom64/",
    "/usr/local/share/doom/",
    "/usr/share/games/imdoom64/",
    "/usr/share/imdoom64/",
    "/usr/share/doom/",
    "/opt/imdoom64/",
    "/app/imdoom64/",
];

#[cfg(not(any(target_os = "linux", target_os = "openbsd")))]
const SYSTEM_DIRS: &[&str] = &[];

/// The platform's default system install locations.
pub fn default_system_dirs() -> Vec<PathBuf> {
    SYSTEM_DIRS.iter().map(PathBuf::from).collect()
}

/// Per-user data directory for `app_name`, e.g. `~/.local/share/<app>`.
pub fn user_data_dir(app_name: &str) -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", app_name).map(|dirs| dirs.data_dir().to_path_buf())
}

/// Directory holding the running executable.
pub fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe().ok()?.parent().map(Path::to_path_buf)
}

/// Ordered list of directories to probe.
#[derive(Debug, Clone, Default)]
pub struct SearchPaths {
    pub base_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub system_dirs: Vec<PathBuf>,
}

impl SearchPaths {
    /// Paths for the current process and platform.
    pub fn for_app(app_name: &str) -> Self {
        Self {
            base_dir: exe_dir(),
            data_dir: user_data_dir(app_name),
            system_dirs: default_system_dirs(),
        }
    }

    /// Every directory in probe order, starting with `hint`.
    pub fn dirs<'a>(&'a self, hint: Option<&'a Path>) -> impl Iterator<Item = &'a Path> + 'a {
        hint.into_iter()
            .chain(self.base_dir.as_deref())
            .chain(self.data_dir.as_deref())
            .chain(self.system_dirs.iter().map(PathBuf::as_path))
    }

    /// First existing regular file called `name`.
    pub fn find(&self, name: &str, hint: Option<&Path>) -> Option<PathBuf> {
        self.dirs(hint).map(|dir| dir.join(name)).find(|path| {
            let found = path.is_file();
            debug!("Probing {}: {}", path.display(), if found { "found" } else { "missing" });
            found
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn paths(base: &TempDir, data: &TempDir) -> SearchPaths {
        SearchPaths {
            base_dir: Some(base.path().to_path_buf()),
            data_dir: Some(data.path().to_path_buf()),
            system_dirs: Vec::new(),
        }
    }

    #[test]
    fn hint_then_base_then_data() {
        let (hint, base, data) = (TempDir::new().unwrap(), TempDir::new().unwrap(), TempDir::new().unwrap());
        let search = paths(&base, &data);
        assert_eq!(search.find("doom64.rom", Some(hint.path())), None);

        fs::write(data.path().join("doom64.rom"), b"d").unwrap();
        assert_eq!(search.find("doom64.rom", None), Some(data.path().join("doom64.rom")));

        fs::write(base.path().join("doom64.rom"), b"b").unwrap();
        assert_eq!(search.find("doom64.rom", None), Some(base.path().join("doom64.rom")));

        fs::write(hint.path().join("doom64.rom"), b"h").unwrap();
        assert_eq!(
            search.find("doom64.rom", Some(hint.path())),
            Some(hint.path().join("doom64.rom"))
        );
    }

    #[test]
    fn directories_do_not_count() {
        let (base, data) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        fs::create_dir(base.path().join("doom64.rom")).unwrap();
        assert_eq!(paths(&base, &data).find("doom64.rom", None), None);
    }

    #[test]
    fn system_dirs_come_last() {
        let (base, data, sys) = (TempDir::new().unwrap(), TempDir::new().unwrap(), TempDir::new().unwrap());
        fs::write(sys.path().join("imdoom64.pk3"), b"s").unwrap();
        let mut search = paths(&base, &data);
        search.system_dirs.push(sys.path().to_path_buf());
        assert_eq!(search.find("imdoom64.pk3", None), Some(sys.path().join("imdoom64.pk3")));
        assert_eq!(search.dirs(None).count(), 3);
    }
}
