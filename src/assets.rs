//! Startup: find the base data, add the supplementary packages, merge.
//!
//! When no base candidate can be found or opened, a [`SourcePicker`] is
//! asked for a file (a file dialog in a GUI host). The picked file is
//! copied into the per-user data directory under the first base name, so
//! the next start finds it without asking.

use std::fs;
use std::path::PathBuf;

use log::{error, info, warn};

use crate::config::AssetConfig;
use crate::container::{Container, LoaderRegistry};
use crate::discovery::SearchPaths;
use crate::namespace::{Namespace, NamespaceBuilder};
use crate::{Error, Result};

/// Interactive fallback for locating base data.
pub trait SourcePicker {
    fn pick(&self) -> Option<PathBuf>;
}

/// A picker that never picks anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPicker;

impl SourcePicker for NoPicker {
    fn pick(&self) -> Option<PathBuf> {
        None
    }
}

/// Open the base data and every extra package, and merge them in order.
pub fn load(config: &AssetConfig, paths: &SearchPaths, picker: &dyn SourcePicker) -> Result<Namespace> {
    let loaders = LoaderRegistry::default();
    let base = open_base(config, paths, &loaders, picker)?;

    let hint = config.search.dir_hint.as_deref();
    let extras = config
        .extra_files
        .iter()
        .map(|name| {
            paths.find(name, hint).ok_or_else(|| {
                error!("Couldn't find '{name}'");
                Error::BaseDataNotFound(name.clone())
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut builder = NamespaceBuilder::new();
    builder.add(base);
    for container in loaders.open_all(&extras) {
        builder.add(container?);
    }
    let namespace = builder.build();
    info!(
        "Loaded {} resources from {} containers",
        namespace.len(),
        namespace.containers().len()
    );
    Ok(namespace)
}

fn open_base(
    config: &AssetConfig,
    paths: &SearchPaths,
    loaders: &LoaderRegistry,
    picker: &dyn SourcePicker,
) -> Result<Container> {
    let hint = config.search.dir_hint.as_deref();
    for name in &config.base_files {
        let Some(path) = paths.find(name, hint) else {
            continue;
        };
        match loaders.open(&path) {
            Ok(container) => {
                info!("Using {} as base data", path.display());
                return Ok(container);
            }
            Err(e) if e.is_recoverable() => info!("Skipping {}: {e}", path.display()),
            Err(e) => warn!("Unusable base data {}: {e}", path.display()),
        }
    }

    let first = config
        .base_files
        .first()
        .ok_or_else(|| Error::BaseDataNotFound("base data".to_string()))?;
    let not_found = || {
        error!("Couldn't find '{first}'");
        Error::BaseDataNotFound(first.clone())
    };

    let picked = picker.pick().ok_or_else(not_found)?;
    let path = match &paths.data_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let dest = dir.join(first);
            fs::copy(&picked, &dest)?;
            info!("Copied {} to {}", picked.display(), dest.display());
            dest
        }
        None => picked,
    };
    loaders.open(&path).map_err(|e| {
        warn!("Picked file {} is unusable: {e}", path.display());
        not_found()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::wad::{WadKind, WadWriter};
    use crate::name::LumpName;
    use tempfile::TempDir;

    struct Picks(PathBuf);

    impl SourcePicker for Picks {
        fn pick(&self) -> Option<PathBuf> {
            Some(self.0.clone())
        }
    }

    fn wad(lump: &str, data: &[u8]) -> Vec<u8> {
        let mut w = WadWriter::new(WadKind::Iwad);
        w.push(LumpName::new(lump).unwrap(), data.to_vec());
        w.finish()
    }

    fn config(base: &[&str], extra: &[&str]) -> AssetConfig {
        AssetConfig {
            base_files: base.iter().map(|s| s.to_string()).collect(),
            extra_files: extra.iter().map(|s| s.to_string()).collect(),
            ..AssetConfig::default()
        }
    }

    fn search(base: &TempDir, data: &TempDir) -> SearchPaths {
        SearchPaths {
            base_dir: Some(base.path().to_path_buf()),
            data_dir: Some(data.path().join("user")),
            system_dirs: Vec::new(),
        }
    }

    #[test]
    fn skips_unrecognized_candidates() {
        let (base, data) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        fs::write(base.path().join("doom64.rom"), b"not a rom at all").unwrap();
        fs::write(base.path().join("doom64.wad"), wad("PLAYPAL", b"p")).unwrap();
        fs::write(base.path().join("mod.wad"), wad("PLAYPAL", b"m")).unwrap();

        let ns = load(
            &config(&["doom64.rom", "doom64.wad"], &["mod.wad"]),
            &search(&base, &data),
            &NoPicker,
        )
        .unwrap();
        assert_eq!(ns.containers().len(), 2);
        assert_eq!(ns.read_bytes("PLAYPAL").unwrap(), b"m");
    }

    #[test]
    fn picked_file_is_copied_into_data_dir() {
        let (base, data, elsewhere) = (TempDir::new().unwrap(), TempDir::new().unwrap(), TempDir::new().unwrap());
        let picked = elsewhere.path().join("my dump.wad");
        fs::write(&picked, wad("MAPINFO", b"x")).unwrap();

        let paths = search(&base, &data);
        let ns = load(&config(&["doom64.wad"], &[]), &paths, &Picks(picked)).unwrap();
        assert!(ns.contains("MAPINFO"));

        // Next start finds the copy without asking.
        let copy = data.path().join("user").join("doom64.wad");
        assert!(copy.is_file());
        assert_eq!(paths.find("doom64.wad", None), Some(copy));
    }

    #[test]
    fn nothing_found_is_fatal() {
        let (base, data) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        let err = load(&config(&["doom64.rom"], &[]), &search(&base, &data), &NoPicker).unwrap_err();
        assert!(matches!(err, Error::BaseDataNotFound(name) if name == "doom64.rom"));
    }

    #[test]
    fn missing_extra_is_fatal() {
        let (base, data) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        fs::write(base.path().join("doom64.wad"), wad("A", b"a")).unwrap();
        let err = load(
            &config(&["doom64.wad"], &["imdoom64.pk3"]),
            &search(&base, &data),
            &NoPicker,
        )
        .unwrap_err();
        assert!(matches!(err, Error::BaseDataNotFound(name) if name == "imdoom64.pk3"));
    }
}
