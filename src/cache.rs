//! Memoised world-space normals per face element.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::error::Result;
use crate::math::{Mat4, Vec3};
use crate::mesh::{FaceElement, PreparedMesh};

/// World normals for one prepared mesh under one normal matrix.
///
/// Shared by every setup worker of a frame. Lookups take the read lock; a
/// miss computes outside any lock and inserts only if no other worker got
/// there first, so the first stored value wins and later ones are dropped.
/// Once the mesh, the normal source or the model transform changes the
/// whole cache is replaced, never patched.
#[derive(Debug)]
pub struct WorldNormalCache {
    prepared: Arc<PreparedMesh>,
    normal_matrix: Mat4,
    normals: RwLock<HashMap<FaceElement, Vec3>>,
    computed: AtomicUsize,
}

impl WorldNormalCache {
    pub fn new(prepared: Arc<PreparedMesh>, normal_matrix: Mat4) -> Self {
        let capacity = prepared.mesh().adjacency().len();
        Self {
            prepared,
            normal_matrix,
            normals: RwLock::new(HashMap::with_capacity(capacity)),
            computed: AtomicUsize::new(0),
        }
    }

    /// Whether this cache is still valid for the given inputs.
    pub fn matches(&self, prepared: &Arc<PreparedMesh>, normal_matrix: &Mat4) -> bool {
        Arc::ptr_eq(&self.prepared, prepared) && self.normal_matrix == *normal_matrix
    }

    pub fn prepared(&self) -> &Arc<PreparedMesh> {
        &self.prepared
    }

    pub fn world_normal(&self, element: &FaceElement) -> Result<Vec3> {
        if let Some(normal) = self.normals.read().get(element) {
            return Ok(*normal);
        }

        let object = self.prepared.object_normal(element)?;
        let world = self.normal_matrix.transform_vector(object).normalize();
        self.computed.fetch_add(1, Ordering::Relaxed);

        let mut normals = self.normals.write();
        Ok(*normals.entry(*element).or_insert(world))
    }

    pub fn len(&self) -> usize {
        self.normals.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many normals were computed, including ones that lost the insert
    /// race.
    pub fn computed(&self) -> usize {
        self.computed.load(Ordering::Relaxed)
    }
}

impl Drop for WorldNormalCache {
    fn drop(&mut self) {
        debug!(
            "dropping world normal cache: {} entries, {} computed",
            self.normals.get_mut().len(),
            self.computed.load(Ordering::Relaxed)
        );
    }
}
