//! Remember set: the log of tenured objects that may point into the nursery.
//!
//! The set is an append-only list with lazy deduplication: the write barrier
//! only enrolls an object whose header remember bit is clear, and sets the
//! bit as it does so, so an object appears at most once. During a scavenge,
//! entries whose object no longer references young data are nulled in place;
//! a major collection clears the whole log (the next scavenge's barriers
//! rebuild it).

use crate::object::ObjectRef;

/// Append-only log of possibly-old-to-young objects.
pub struct RememberSet {
    entries: Vec<Option<ObjectRef>>,
}

impl RememberSet {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append an object. The caller has already set its remember bit.
    #[inline]
    pub(crate) fn push(&mut self, obj: ObjectRef) {
        debug_assert!(obj.remembered());
        self.entries.push(Some(obj));
    }

    /// Number of slots, nulled entries included.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the log holds no slots at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of live (non-null) entries.
    pub fn live_entries(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Read a slot.
    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<ObjectRef> {
        self.entries[index]
    }

    /// Null a slot whose object no longer references young data.
    #[inline]
    pub(crate) fn clear_slot(&mut self, index: usize) {
        self.entries[index] = None;
    }

    /// Drop every entry. Remember bits are the caller's business.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate the live entries.
    pub fn iter(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.entries.iter().filter_map(|e| *e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Tenure;
    use crate::object::{ObjectKind, HEADER_WORDS};

    fn remembered_cell() -> ObjectRef {
        let cell = Tenure::alloc_cell(HEADER_WORDS);
        let obj = ObjectRef::from_raw(cell.as_ptr()).unwrap();
        obj.init_header(ObjectKind::Normal, 0, 0, 0, true);
        obj.set_remembered();
        obj
    }

    #[test]
    fn test_push_and_count() {
        let mut rs = RememberSet::new(4);
        assert!(rs.is_empty());
        let a = remembered_cell();
        let b = remembered_cell();
        rs.push(a);
        rs.push(b);
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.live_entries(), 2);
        Tenure::free_cell(a);
        Tenure::free_cell(b);
    }

    #[test]
    fn test_clear_slot_keeps_length() {
        let mut rs = RememberSet::new(4);
        let a = remembered_cell();
        rs.push(a);
        rs.clear_slot(0);
        assert_eq!(rs.len(), 1);
        assert_eq!(rs.live_entries(), 0);
        assert!(rs.get(0).is_none());
        Tenure::free_cell(a);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut rs = RememberSet::new(4);
        let a = remembered_cell();
        rs.push(a);
        rs.clear();
        assert!(rs.is_empty());
        Tenure::free_cell(a);
    }
}
