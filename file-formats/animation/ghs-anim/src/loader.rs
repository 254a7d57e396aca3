//! Submodel lookup used by the compiler

use std::collections::BTreeMap;

use ghs_pm2::Model;

use crate::rig::SubmodelId;

/// Source of decoded submodels
///
/// `Ok(None)` means the submodel does not exist; the compiler records a
/// missing-asset warning and keeps the slot without geometry.
pub trait SubmodelLoader {
    fn load_submodel(&mut self, id: SubmodelId) -> ghs_pm2::Result<Option<Model>>;
}

impl SubmodelLoader for BTreeMap<SubmodelId, Model> {
    fn load_submodel(&mut self, id: SubmodelId) -> ghs_pm2::Result<Option<Model>> {
        Ok(self.get(&id).cloned())
    }
}
