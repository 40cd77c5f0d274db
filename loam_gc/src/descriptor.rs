//! Type descriptors: per-kind metadata and sweep cleanup hooks.
//!
//! The sweep phase of a major collection runs a cleanup hook on every dead
//! tenured object before freeing its cell, so hosts can release external
//! resources owned by a managed object. The hook is looked up through a
//! descriptor table keyed by the header's 2-bit kind; normal objects select
//! among up to 64 host-registered descriptors through the header dispatch
//! index. Array kinds have fixed descriptors with no cleanup.
//!
//! Cleanup runs only at sweep time, never for nursery objects that die
//! young: anything needing the hook must be allocated directly in tenure.

use crate::object::{ObjectKind, ObjectRef, MAX_DISPATCH};

/// A cleanup hook, invoked on a dead tenured object before its cell is
/// freed. The object's header and body are still intact; other objects may
/// already be gone.
pub type CleanupFn = fn(ObjectRef);

/// Host-visible metadata for one object type.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    /// Diagnostic name.
    pub name: &'static str,
    /// Optional sweep hook.
    pub cleanup: Option<CleanupFn>,
}

impl TypeDescriptor {
    /// A descriptor with no cleanup hook.
    pub const fn plain(name: &'static str) -> Self {
        Self {
            name,
            cleanup: None,
        }
    }

    /// A descriptor with a cleanup hook.
    pub const fn with_cleanup(name: &'static str, cleanup: CleanupFn) -> Self {
        Self {
            name,
            cleanup: Some(cleanup),
        }
    }
}

/// Descriptor lookup table: fixed entries for the array kinds, a dispatch
/// slot per registered normal type.
pub struct DescriptorTable {
    normal: [TypeDescriptor; MAX_DISPATCH],
    unbox_array: TypeDescriptor,
    box_array: TypeDescriptor,
}

impl DescriptorTable {
    pub(crate) fn new() -> Self {
        Self {
            normal: [TypeDescriptor::plain("object"); MAX_DISPATCH],
            unbox_array: TypeDescriptor::plain("unbox-array"),
            box_array: TypeDescriptor::plain("box-array"),
        }
    }

    /// Register a descriptor for normal objects carrying `dispatch` in
    /// their header. Replaces any previous registration.
    pub(crate) fn register(&mut self, dispatch: u8, descriptor: TypeDescriptor) {
        self.normal[dispatch as usize] = descriptor;
    }

    /// Descriptor for an object, selected by kind and dispatch index.
    pub fn descriptor_for(&self, obj: ObjectRef) -> &TypeDescriptor {
        match obj.kind() {
            ObjectKind::Normal => &self.normal[obj.dispatch_index() as usize],
            ObjectKind::UnboxArray => &self.unbox_array,
            ObjectKind::BoxArray => &self.box_array,
        }
    }

    /// Run the cleanup hook for a dead tenured object, if any.
    pub(crate) fn run_cleanup(&self, obj: ObjectRef) {
        if let Some(cleanup) = self.descriptor_for(obj).cleanup {
            cleanup(obj);
        }
    }
}
