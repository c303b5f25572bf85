//! Integer-name tables for native graphics objects.
//!
//! One growable table per resource kind, indexed by the guest-visible name. Names
//! come from a single counter shared by every kind, starting at 1, and are never
//! reused: deleting an object leaves a `Deleted` tombstone in its slot. Name 0 is
//! "no object" for every kind.

use super::NativeObject;

/// Resource kinds with their own name table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Program,
    Shader,
    Framebuffer,
    Renderbuffer,
    VertexArray,
    Query,
    UniformLocation,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Buffer,
        ResourceKind::Texture,
        ResourceKind::Program,
        ResourceKind::Shader,
        ResourceKind::Framebuffer,
        ResourceKind::Renderbuffer,
        ResourceKind::VertexArray,
        ResourceKind::Query,
        ResourceKind::UniformLocation,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// Readable name used in validation messages.
    pub const fn label(self) -> &'static str {
        match self {
            ResourceKind::Buffer => "buffer",
            ResourceKind::Texture => "texture",
            ResourceKind::Program => "program",
            ResourceKind::Shader => "shader",
            ResourceKind::Framebuffer => "framebuffer",
            ResourceKind::Renderbuffer => "renderbuffer",
            ResourceKind::VertexArray => "vertex array",
            ResourceKind::Query => "query",
            ResourceKind::UniformLocation => "location",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Slot {
    /// Never held an object of this kind.
    Vacant,
    /// Held an object that has since been deleted.
    Deleted,
    Live(NativeObject),
}

/// Outcome of validating a guest-supplied name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Validity {
    /// Name 0.
    Null,
    Live(NativeObject),
    Deleted,
    Invalid,
}

#[derive(Debug)]
pub struct ObjectTables {
    next: u32,
    tables: [Vec<Slot>; ResourceKind::ALL.len()],
}

impl Default for ObjectTables {
    fn default() -> Self {
        Self {
            next: 1,
            tables: Default::default(),
        }
    }
}

impl ObjectTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// The name the next allocation will receive.
    pub fn counter(&self) -> u32 {
        self.next
    }

    /// Reserve a fresh name for `kind`, padding its table up to it.
    ///
    /// Returns 0 once the name space is exhausted.
    pub fn allocate(&mut self, kind: ResourceKind) -> u32 {
        let id = self.next;
        if id == u32::MAX {
            tracing::error!(kind = kind.label(), "graphics name space exhausted");
            return 0;
        }
        self.next += 1;

        let table = &mut self.tables[kind.index()];
        if table.len() <= id as usize {
            table.resize(id as usize + 1, Slot::Vacant);
        }
        id
    }

    /// Reserve a name and store `object` under it.
    pub fn insert_new(&mut self, kind: ResourceKind, object: NativeObject) -> u32 {
        let id = self.allocate(kind);
        if id != 0 {
            self.tables[kind.index()][id as usize] = Slot::Live(object);
        }
        id
    }

    /// Store `object` under a name previously returned by [`allocate`](Self::allocate).
    pub fn insert(&mut self, kind: ResourceKind, id: u32, object: NativeObject) -> bool {
        match self.tables[kind.index()].get_mut(id as usize) {
            Some(slot) if id != 0 => {
                *slot = Slot::Live(object);
                true
            }
            _ => false,
        }
    }

    /// Native object behind `id`, without logging.
    pub fn get(&self, kind: ResourceKind, id: u32) -> Option<NativeObject> {
        match self.tables[kind.index()].get(id as usize) {
            Some(Slot::Live(object)) => Some(*object),
            _ => None,
        }
    }

    pub fn check(&self, kind: ResourceKind, id: u32) -> Validity {
        if id == 0 {
            return Validity::Null;
        }
        match self.tables[kind.index()].get(id as usize) {
            Some(Slot::Live(object)) => Validity::Live(*object),
            Some(Slot::Deleted) => Validity::Deleted,
            Some(Slot::Vacant) | None => Validity::Invalid,
        }
    }

    /// Log a bad name for `caller`; never fails.
    pub fn validate(&self, kind: ResourceKind, id: u32, caller: &str) -> Validity {
        let validity = self.check(kind, id);
        match validity {
            Validity::Deleted => {
                tracing::error!("{caller} called with an already deleted {} ID {id}", kind.label());
            }
            Validity::Invalid => {
                tracing::error!("{caller} called with an invalid {} ID {id}", kind.label());
            }
            Validity::Null | Validity::Live(_) => {}
        }
        validity
    }

    /// Validate and resolve; bad names degrade to "no object".
    pub fn resolve(&self, kind: ResourceKind, id: u32, caller: &str) -> Option<NativeObject> {
        match self.validate(kind, id, caller) {
            Validity::Live(object) => Some(object),
            _ => None,
        }
    }

    /// Tombstone `id`, returning the object that was live there.
    pub fn remove(&mut self, kind: ResourceKind, id: u32) -> Option<NativeObject> {
        let slot = self.tables[kind.index()].get_mut(id as usize)?;
        match *slot {
            Slot::Live(object) => {
                *slot = Slot::Deleted;
                Some(object)
            }
            _ => None,
        }
    }

    /// Guest name currently bound to `object`, searching every kind.
    pub fn name_of(&self, object: NativeObject) -> Option<u32> {
        self.tables.iter().find_map(|table| {
            table
                .iter()
                .position(|slot| *slot == Slot::Live(object))
                .map(|i| i as u32)
        })
    }

    /// Live `(name, object)` pairs of `kind`.
    pub fn live(&self, kind: ResourceKind) -> impl Iterator<Item = (u32, NativeObject)> + '_ {
        self.tables[kind.index()]
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                Slot::Live(object) => Some((i as u32, *object)),
                _ => None,
            })
    }

    pub fn live_count(&self, kind: ResourceKind) -> usize {
        self.live(kind).count()
    }

    /// Tombstone every live slot. The counter keeps its position.
    pub fn clear(&mut self) {
        for table in &mut self.tables {
            for slot in table.iter_mut() {
                if matches!(slot, Slot::Live(_)) {
                    *slot = Slot::Deleted;
                }
            }
        }
    }
}
