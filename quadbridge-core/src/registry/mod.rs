//! Handle registry for host values the guest holds by reference.
//!
//! The guest only ever sees an `i32`. Two ids are reserved and never stored:
//! `-1` is the host null value and `-2` the absent value. Every other id comes from
//! a per-session counter starting at 0 that never rewinds, so an id is never handed
//! out twice even after its entry has been consumed or released.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Id returned for [`HostValue::Null`].
pub const NULL_ID: i32 = -1;
/// Id returned for [`HostValue::Undefined`].
pub const UNDEFINED_ID: i32 = -2;

/// Field map behind [`HostValue::Object`].
pub type ObjectFields = BTreeMap<String, HostValue>;

/// A host value that can be referenced from the guest.
///
/// Reference-like variants are `Rc`s, so cloning a `HostValue` yields the same
/// underlying allocation; [`HostValue::same`] compares by identity for those.
#[derive(Clone, Debug, Default)]
pub enum HostValue {
    Null,
    #[default]
    Undefined,
    Bool(bool),
    Number(f64),
    Text(Rc<str>),
    Bytes(Rc<[u8]>),
    Object(Rc<RefCell<ObjectFields>>),
}

impl HostValue {
    pub fn text(s: impl Into<Rc<str>>) -> Self {
        HostValue::Text(s.into())
    }

    pub fn bytes(b: impl Into<Rc<[u8]>>) -> Self {
        HostValue::Bytes(b.into())
    }

    pub fn object() -> Self {
        HostValue::Object(Rc::new(RefCell::new(ObjectFields::new())))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, HostValue::Undefined)
    }

    /// Identity for reference values, equality for scalars.
    pub fn same(&self, other: &HostValue) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) | (HostValue::Undefined, HostValue::Undefined) => {
                true
            }
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Number(a), HostValue::Number(b)) => a.to_bits() == b.to_bits(),
            (HostValue::Text(a), HostValue::Text(b)) => Rc::ptr_eq(a, b),
            (HostValue::Bytes(a), HostValue::Bytes(b)) => Rc::ptr_eq(a, b),
            (HostValue::Object(a), HostValue::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Numeric coercion used by the typed field getters.
    pub fn to_number(&self) -> f64 {
        match self {
            HostValue::Null => 0.0,
            HostValue::Bool(b) => f64::from(u8::from(*b)),
            HostValue::Number(n) => *n,
            HostValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            HostValue::Undefined | HostValue::Bytes(_) | HostValue::Object(_) => f64::NAN,
        }
    }

    /// Wrapping 32-bit conversion; NaN and infinities become 0.
    pub fn to_u32(&self) -> u32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        n.trunc().rem_euclid(4_294_967_296.0) as u32
    }
}

/// Maps guest-visible ids to host values.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    entries: HashMap<i32, HostValue>,
    next_id: i32,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` and return its id (`-1`/`-2` for null/absent, never stored).
    ///
    /// Returns [`NULL_ID`] once the id space is exhausted.
    pub fn register(&mut self, value: HostValue) -> i32 {
        match value {
            HostValue::Null => NULL_ID,
            HostValue::Undefined => UNDEFINED_ID,
            value => {
                let id = self.next_id;
                if id == i32::MAX {
                    tracing::error!("handle id space exhausted");
                    return NULL_ID;
                }
                self.next_id += 1;
                self.entries.insert(id, value);
                id
            }
        }
    }

    /// Remove and return the value behind `id`.
    ///
    /// Unknown or already-consumed ids yield [`HostValue::Undefined`].
    pub fn consume(&mut self, id: i32) -> HostValue {
        match id {
            NULL_ID => HostValue::Null,
            UNDEFINED_ID => HostValue::Undefined,
            _ => self.entries.remove(&id).unwrap_or_default(),
        }
    }

    /// Return the value behind `id` without removing it.
    pub fn borrow(&self, id: i32) -> HostValue {
        match id {
            NULL_ID => HostValue::Null,
            UNDEFINED_ID => HostValue::Undefined,
            _ => self.entries.get(&id).cloned().unwrap_or_default(),
        }
    }

    pub fn release(&mut self, id: i32) {
        self.entries.remove(&id);
    }

    pub fn contains(&self, id: i32) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. The counter keeps its position.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Field map of the object behind `id`, if it is one.
    pub fn object(&self, id: i32) -> Option<Rc<RefCell<ObjectFields>>> {
        match self.entries.get(&id) {
            Some(HostValue::Object(fields)) => Some(Rc::clone(fields)),
            _ => None,
        }
    }

    /// Set `field` on the object behind `id`. Returns `false` when `id` is not an object.
    pub fn set_field(&mut self, id: i32, field: String, value: HostValue) -> bool {
        match self.object(id) {
            Some(fields) => {
                fields.borrow_mut().insert(field, value);
                true
            }
            None => {
                tracing::warn!(id, %field, "set_field on a handle that is not an object");
                false
            }
        }
    }

    /// Value of `field` on the object behind `id` (absent when missing).
    pub fn field(&self, id: i32, field: &str) -> HostValue {
        match self.object(id) {
            Some(fields) => fields.borrow().get(field).cloned().unwrap_or_default(),
            None => {
                tracing::warn!(id, field, "field read on a handle that is not an object");
                HostValue::Undefined
            }
        }
    }
}
