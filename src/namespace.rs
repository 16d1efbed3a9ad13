//! The merged, override-resolved name index over all opened containers.
//!
//! Containers are added to a [`NamespaceBuilder`] in priority order, base
//! data first. [`NamespaceBuilder::build`] freezes them into a [`Namespace`]
//! where every name resolves to the entry of the most recently added
//! container that defines it.
//!
//! Entries are addressed by [`LumpRef`] - a `(container, index)` pair into
//! the namespace's own container list - so no entry ever points back at its
//! container.

use std::io::Cursor;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::container::{Container, Entry};
use crate::name::{LumpName, Section};
use crate::{Error, Result};

/// Position of a container in add order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub usize);

/// Address of one entry within a [`Namespace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LumpRef {
    pub container: ContainerId,
    pub index: usize,
}

/// Collects containers in add order.
#[derive(Debug, Default)]
pub struct NamespaceBuilder {
    containers: Vec<Container>,
}

impl NamespaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a container. Later containers shadow earlier ones by name.
    pub fn add(&mut self, container: Container) -> ContainerId {
        self.containers.push(container);
        ContainerId(self.containers.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Resolve every name and freeze the result.
    pub fn build(self) -> Namespace {
        let mut names: FxHashMap<LumpName, LumpRef> = FxHashMap::default();
        let mut sections: FxHashMap<(Section, LumpName), LumpRef> = FxHashMap::default();
        let mut textures = Vec::new();

        for (c, container) in self.containers.iter().enumerate() {
            for (index, entry) in container.read_all().iter().enumerate() {
                let lump = LumpRef {
                    container: ContainerId(c),
                    index,
                };
                if let Some(prev) = names.insert(entry.name, lump) {
                    let prev = &self.containers[prev.container.0];
                    debug!(
                        "{} from {} shadows {}",
                        entry.name,
                        container.path().display(),
                        prev.path().display()
                    );
                }
                sections.insert((entry.section, entry.name), lump);
            }
            for name in container.texture_names() {
                if !textures.contains(name) {
                    textures.push(*name);
                }
            }
        }

        Namespace {
            containers: self.containers,
            names,
            sections,
            textures,
        }
    }
}

/// A frozen, read-only name index.
#[derive(Debug, Default)]
pub struct Namespace {
    containers: Vec<Container>,
    names: FxHashMap<LumpName, LumpRef>,
    sections: FxHashMap<(Section, LumpName), LumpRef>,
    textures: Vec<LumpName>,
}

impl Namespace {
    /// Resolve `name` (case-insensitive) to the winning entry.
    pub fn lookup(&self, name: &str) -> Option<LumpRef> {
        self.names.get(&LumpName::new(name)?).copied()
    }

    /// Resolve `name` among entries of one section only.
    pub fn lookup_in(&self, section: Section, name: &str) -> Option<LumpRef> {
        self.sections.get(&(section, LumpName::new(name)?)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn entry(&self, lump: LumpRef) -> Option<&Entry> {
        self.containers.get(lump.container.0)?.entry(lump.index)
    }

    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(id.0)
    }

    /// Containers in add order.
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// Open the winning entry for `name` as an owned stream.
    pub fn open(&self, name: &str) -> Result<Cursor<Vec<u8>>> {
        let lump = self.lookup(name).ok_or_else(|| Error::NotFound(name.to_string()))?;
        self.open_ref(lump)
    }

    pub fn open_ref(&self, lump: LumpRef) -> Result<Cursor<Vec<u8>>> {
        self.read_ref(lump).map(Cursor::new)
    }

    /// Read the winning entry for `name` into memory.
    pub fn read_bytes(&self, name: &str) -> Result<Vec<u8>> {
        let lump = self.lookup(name).ok_or_else(|| Error::NotFound(name.to_string()))?;
        self.read_ref(lump)
    }

    pub fn read_ref(&self, lump: LumpRef) -> Result<Vec<u8>> {
        let container = self
            .containers
            .get(lump.container.0)
            .ok_or(Error::InvalidRange)?;
        let entry = container.entry(lump.index).ok_or(Error::InvalidRange)?;
        container.read_bytes(entry)
    }

    /// Sorted names with at least one entry in `section`. A listed name's
    /// global [`Namespace::lookup`] winner may still live in another section;
    /// use [`Namespace::lookup_in`] to reach the entry listed here.
    pub fn names_in(&self, section: Section) -> Vec<LumpName> {
        let mut names: Vec<_> = self
            .sections
            .keys()
            .filter(|(s, _)| *s == section)
            .map(|(_, n)| *n)
            .collect();
        names.sort();
        names
    }

    /// Texture names of every container in add order, without duplicates.
    pub fn known_textures(&self) -> &[LumpName] {
        &self.textures
    }

    /// Every resolved name with its winning entry, ordered by address.
    pub fn resolved(&self) -> Vec<(LumpName, LumpRef)> {
        let mut all: Vec<_> = self.names.iter().map(|(n, r)| (*n, *r)).collect();
        all.sort_by_key(|(_, r)| *r);
        all
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A namespace that can be swapped out wholesale on reload.
///
/// Readers take a [`SharedNamespace::snapshot`] and keep using it even if a
/// reload replaces the namespace meanwhile.
#[derive(Debug, Clone, Default)]
pub struct SharedNamespace {
    inner: Arc<RwLock<Arc<Namespace>>>,
}

impl SharedNamespace {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(namespace))),
        }
    }

    pub fn snapshot(&self) -> Arc<Namespace> {
        self.inner.read().clone()
    }

    /// Install `namespace`, returning the one it replaces.
    pub fn replace(&self, namespace: Namespace) -> Arc<Namespace> {
        std::mem::replace(&mut *self.inner.write(), Arc::new(namespace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::wad::{WadKind, WadWriter};

    fn wad(label: &str, lumps: &[(&str, &str)]) -> Container {
        let mut w = WadWriter::new(WadKind::Pwad);
        for (name, data) in lumps {
            w.push(LumpName::new(name).unwrap(), data.as_bytes().to_vec());
        }
        Container::wad(label, Cursor::new(w.finish())).unwrap()
    }

    fn sectioned(label: &str) -> Container {
        wad(
            label,
            &[
                ("T_START", ""),
                ("STONE", "wall"),
                ("SKY", "tex"),
                ("T_END", ""),
                ("S_START", ""),
                ("SKY", "sprite"),
                ("S_END", ""),
            ],
        )
    }

    #[test]
    fn later_container_wins() {
        let mut b = NamespaceBuilder::new();
        let a = b.add(wad("a.wad", &[("PLAYPAL", "old"), ("ONLYA", "a")]));
        let c = b.add(wad("b.wad", &[("playpal", "new")]));
        let ns = b.build();

        assert_eq!(ns.lookup("PlayPal").unwrap().container, c);
        assert_eq!(ns.lookup("ONLYA").unwrap().container, a);
        assert_eq!(ns.read_bytes("PLAYPAL").unwrap(), b"new");
        assert_eq!(ns.open("onlya").unwrap().into_inner(), b"a");
        assert_eq!(ns.len(), 2);
    }

    #[test]
    fn missing_and_overlong_names() {
        let ns = NamespaceBuilder::new().build();
        assert!(ns.is_empty());
        assert!(ns.lookup("TOOLONGNAME").is_none());
        assert!(matches!(ns.open("NOPE"), Err(Error::NotFound(n)) if n == "NOPE"));
    }

    #[test]
    fn sections_are_queryable_separately() {
        let mut b = NamespaceBuilder::new();
        b.add(sectioned("s.wad"));
        let ns = b.build();

        // Plain lookup follows directory order; the sprite came last.
        let sky = ns.lookup("SKY").unwrap();
        assert_eq!(ns.entry(sky).unwrap().section, Section::Sprites);
        let tex = ns.lookup_in(Section::Textures, "SKY").unwrap();
        assert_eq!(ns.read_ref(tex).unwrap(), b"tex");

        let names: Vec<_> = ns.names_in(Section::Textures).iter().map(|n| n.to_string()).collect();
        assert_eq!(names, ["SKY", "STONE"]);
        // Listed under textures even though the global winner is a sprite.
        assert_ne!(ns.lookup("SKY"), ns.lookup_in(Section::Textures, "SKY"));
    }

    #[test]
    fn known_textures_are_deduplicated() {
        let mut b = NamespaceBuilder::new();
        b.add(sectioned("a.wad"));
        b.add(sectioned("b.wad"));
        let ns = b.build();
        let names: Vec<_> = ns.known_textures().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, ["STONE", "SKY"]);
    }

    #[test]
    fn resolved_is_address_ordered() {
        let mut b = NamespaceBuilder::new();
        b.add(wad("a.wad", &[("ONE", "1"), ("TWO", "2")]));
        b.add(wad("b.wad", &[("ONE", "!")]));
        let ns = b.build();
        let got: Vec<_> = ns
            .resolved()
            .into_iter()
            .map(|(n, r)| (n.to_string(), r.container.0))
            .collect();
        assert_eq!(got, [("TWO".to_string(), 0), ("ONE".to_string(), 1)]);
    }

    #[test]
    fn replace_keeps_old_snapshots_alive() {
        let mut b = NamespaceBuilder::new();
        b.add(wad("a.wad", &[("LUMP", "before")]));
        let shared = SharedNamespace::new(b.build());
        let old = shared.snapshot();

        let mut b = NamespaceBuilder::new();
        b.add(wad("b.wad", &[("LUMP", "after")]));
        shared.replace(b.build());

        assert_eq!(old.read_bytes("LUMP").unwrap(), b"before");
        assert_eq!(shared.snapshot().read_bytes("LUMP").unwrap(), b"after");
    }
}
