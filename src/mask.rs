//! Permission mask compilation
//!
//! For each permission, roles are visited by weight descending (ties by
//! id). The first role whose effective value (own override, else its
//! inheritance chain) states an opinion decides; no opinion anywhere
//! means deny.

use std::sync::Arc;

use crate::cache::fingerprint;
use crate::db::Store;
use crate::error::Result;
use crate::graph::RoleGraph;
use crate::permission::{PermissionId, Registry};
use crate::role::{Role, RoleId};

const WORD: usize = 64;

/// Final allow/deny for every registered permission
#[derive(Debug, Clone)]
pub struct CompiledMask {
    registry: Arc<Registry>,
    bits: Vec<u64>,
    /// Role that decided each permission; `None` = default deny
    source: Vec<Option<RoleId>>,
    roles: Vec<RoleId>,
}

impl CompiledMask {
    /// A mask that denies everything
    pub fn deny_all(registry: Arc<Registry>) -> Self {
        let n = registry.len();
        CompiledMask {
            bits: vec![0; n.div_ceil(WORD)],
            source: vec![None; n],
            roles: Vec::new(),
            registry,
        }
    }

    #[inline]
    pub fn get(&self, p: PermissionId) -> bool {
        let i = p.index();
        self.bits.get(i / WORD).is_some_and(|w| w & (1 << (i % WORD)) != 0)
    }

    #[inline]
    fn set(&mut self, p: PermissionId) {
        let i = p.index();
        self.bits[i / WORD] |= 1 << (i % WORD);
    }

    /// Look up a permission by key
    pub fn allows(&self, permission: &str) -> Result<bool> {
        Ok(self.get(self.registry.id(permission)?))
    }

    /// Role whose opinion decided `permission`, `None` for default deny
    pub fn decided_by(&self, permission: &str) -> Result<Option<RoleId>> {
        let p = self.registry.id(permission)?;
        Ok(self.source.get(p.index()).copied().flatten())
    }

    /// Keys of every allowed permission, in registry order
    pub fn allowed(&self) -> Vec<&str> {
        self.registry
            .iter()
            .filter(|(p, _)| self.get(*p))
            .map(|(_, k)| k)
            .collect()
    }

    pub fn count_allowed(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Role ids in the order they were consulted
    pub fn roles(&self) -> &[RoleId] {
        &self.roles
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

/// Compile `roles` against `graph`. Roles absent from the graph contribute
/// no opinion. Never fails.
pub fn compile(registry: &Arc<Registry>, graph: &RoleGraph, roles: &[Role]) -> CompiledMask {
    let mut ordered: Vec<&Role> = roles.iter().collect();
    ordered.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.id.cmp(&b.id)));
    ordered.dedup_by_key(|r| r.id);

    let width = registry.len();
    let mut mask = CompiledMask::deny_all(registry.clone());
    mask.roles = ordered.iter().map(|r| r.id).collect();
    let mut open = width;

    for role in ordered {
        if open == 0 {
            break;
        }
        let Some(i) = graph.index_of(role.id) else {
            tracing::debug!(role = role.id, "role not in snapshot, no opinion");
            continue;
        };
        for (p, v) in graph.flatten(i, width).into_iter().enumerate() {
            let Some(v) = v else { continue };
            if mask.source[p].is_some() {
                continue;
            }
            mask.source[p] = Some(role.id);
            if v {
                mask.set(PermissionId(p as u32));
            }
            open -= 1;
        }
    }
    tracing::debug!(roles = ?mask.roles, allowed = mask.count_allowed(), "mask compiled");
    mask
}

impl Store {
    /// Compile the mask for `roles` from the current snapshot, reusing a
    /// cached mask for the same role set when one is valid
    pub fn compile_mask(&self, roles: &[Role]) -> Result<Arc<CompiledMask>> {
        let mut ids: Vec<(i64, RoleId)> = roles.iter().map(|r| (r.weight, r.id)).collect();
        ids.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        ids.dedup();
        let ids: Vec<RoleId> = ids.into_iter().map(|(_, id)| id).collect();
        let fp = fingerprint(&ids);
        if let Some(m) = self.cache().get(&fp) {
            tracing::debug!(roles = ?ids, "mask cache hit");
            return Ok(m);
        }
        let generation = self.cache().generation();
        let (graph, roles) = self.read(|d, tx| {
            let g = RoleGraph::load(d, tx, self.registry(), &ids)?;
            // weights come from the snapshot, not the caller's copies
            let current: Vec<Role> = roles
                .iter()
                .map(|r| g.index_of(r.id).map(|i| g.node(i).role.clone()).unwrap_or_else(|| r.clone()))
                .collect();
            Ok((g, current))
        })?;
        let mask = Arc::new(compile(self.registry(), &graph, &roles));
        let mut deps: Vec<RoleId> = ids.iter().flat_map(|id| graph.dependencies(*id)).collect();
        deps.sort_unstable();
        deps.dedup();
        self.cache().insert(fp, mask.clone(), deps, generation);
        Ok(mask)
    }

    /// Roles for `user` on `board` compiled into one mask
    pub fn compile_for(&self, user: Option<crate::role::UserId>, board: Option<&str>) -> Result<Arc<CompiledMask>> {
        let roles = self.roles_for_user_and_board(user, board)?;
        self.compile_mask(&roles)
    }
}
