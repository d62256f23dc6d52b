//! Inheritance arena: roles indexed by id, `inherit_id` resolved to an
//! arena index, overrides keyed by permission id.

use std::collections::HashMap;

use heed::RoTxn;

use crate::constants::MAX_INHERITANCE_DEPTH;
use crate::db::Dbs;
use crate::error::Result;
use crate::permission::{PermissionId, Registry};
use crate::read::{load_role, override_rows};
use crate::role::{Role, RoleId};

#[derive(Debug, Clone)]
pub struct RoleNode {
    pub role: Role,
    /// Arena index of `role.inherit_id`, if that role is loaded
    pub parent: Option<usize>,
    pub overrides: HashMap<PermissionId, bool>,
}

/// Snapshot of the roles needed for one compilation
#[derive(Debug, Clone, Default)]
pub struct RoleGraph {
    nodes: Vec<RoleNode>,
    index: HashMap<RoleId, usize>,
}

impl RoleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a role with its direct overrides. Parent links are
    /// resolved by [`RoleGraph::link`].
    pub fn insert(&mut self, role: Role, overrides: impl IntoIterator<Item = (PermissionId, bool)>) -> usize {
        let node = RoleNode { role, parent: None, overrides: overrides.into_iter().collect() };
        match self.index.get(&node.role.id) {
            Some(&i) => {
                self.nodes[i] = node;
                i
            }
            None => {
                let i = self.nodes.len();
                self.index.insert(node.role.id, i);
                self.nodes.push(node);
                i
            }
        }
    }

    /// Same as [`RoleGraph::insert`] with keys resolved through `registry`
    pub fn insert_keyed(&mut self, registry: &Registry, role: Role, overrides: &[(&str, bool)]) -> Result<usize> {
        let mut o = Vec::with_capacity(overrides.len());
        for (k, v) in overrides {
            o.push((registry.id(k)?, *v));
        }
        Ok(self.insert(role, o))
    }

    /// Resolve every `inherit_id` to an arena index. Unloaded parents stay
    /// `None`, which reads as "no opinion".
    pub fn link(&mut self) {
        for i in 0..self.nodes.len() {
            self.nodes[i].parent = self.nodes[i].role.inherit_id.and_then(|p| self.index.get(&p).copied());
        }
    }

    /// Load `roots` and their inheritance chains from one read transaction.
    /// Overrides naming unregistered permissions are ignored.
    pub(crate) fn load(d: &Dbs, tx: &RoTxn, registry: &Registry, roots: &[RoleId]) -> Result<Self> {
        let mut g = RoleGraph::new();
        for &root in roots {
            let mut cur = Some(root);
            // one node past the bound, so `chain` can tell an over-deep
            // chain from one that ends
            for _ in 0..MAX_INHERITANCE_DEPTH + 2 {
                let Some(id) = cur else { break };
                if g.index.contains_key(&id) {
                    break;
                }
                let Some(role) = load_role(d, tx, id)? else {
                    tracing::warn!(role = id, "inheritance points at a missing role");
                    break;
                };
                let overrides: Vec<(PermissionId, bool)> = override_rows(d, tx, id)?
                    .into_iter()
                    .filter_map(|(k, v)| registry.id(&k).ok().map(|p| (p, v)))
                    .collect();
                cur = role.inherit_id;
                g.insert(role, overrides);
            }
        }
        g.link();
        Ok(g)
    }

    #[inline]
    pub fn index_of(&self, id: RoleId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    #[inline]
    pub fn node(&self, i: usize) -> &RoleNode {
        &self.nodes[i]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Arena indices from `i` up its chain, at most
    /// `MAX_INHERITANCE_DEPTH` links. `None` if the chain does not end
    /// in time (cyclic or too deep).
    pub fn chain(&self, i: usize) -> Option<Vec<usize>> {
        let mut out = vec![i];
        let mut cur = self.nodes[i].parent;
        while let Some(p) = cur {
            if out.len() > MAX_INHERITANCE_DEPTH {
                tracing::warn!(role = self.nodes[i].role.id, "inheritance chain does not terminate");
                return None;
            }
            out.push(p);
            cur = self.nodes[p].parent;
        }
        Some(out)
    }

    /// Every role id the resolution of `id` reads from
    pub fn dependencies(&self, id: RoleId) -> Vec<RoleId> {
        let Some(i) = self.index_of(id) else { return vec![id] };
        let mut out = vec![id];
        let mut cur = self.nodes[i].parent;
        while let Some(p) = cur {
            let pid = self.nodes[p].role.id;
            if out.contains(&pid) {
                break;
            }
            out.push(pid);
            cur = self.nodes[p].parent;
        }
        out
    }

    /// Effective value of one permission for the role at `i`: its own
    /// override, else its parent's, transitively
    pub fn effective(&self, i: usize, p: PermissionId) -> Option<bool> {
        self.chain(i)?
            .into_iter()
            .find_map(|n| self.nodes[n].overrides.get(&p).copied())
    }

    /// Effective values for every permission below `width`
    pub fn flatten(&self, i: usize, width: usize) -> Vec<Option<bool>> {
        let mut out = vec![None; width];
        let Some(chain) = self.chain(i) else { return out };
        for n in chain {
            for (p, v) in &self.nodes[n].overrides {
                if let Some(slot) = out.get_mut(p.index()) {
                    if slot.is_none() {
                        *slot = Some(*v);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::RoleSpec;

    fn role(id: RoleId, weight: i64, parent: Option<RoleId>) -> Role {
        let mut spec = RoleSpec::new(&format!("r{}", id), weight);
        spec.inherit_id = parent;
        spec.into_role(id)
    }

    #[test]
    fn child_defers_to_parent() {
        let mut g = RoleGraph::new();
        let p = PermissionId(0);
        g.insert(role(1, 10, None), [(p, false)]);
        let c = g.insert(role(2, 20, Some(1)), []);
        g.link();
        assert_eq!(g.effective(c, p), Some(false));
        assert_eq!(g.effective(c, PermissionId(1)), None);
    }

    #[test]
    fn own_override_shadows_parent() {
        let mut g = RoleGraph::new();
        let p = PermissionId(0);
        g.insert(role(1, 10, None), [(p, false)]);
        let c = g.insert(role(2, 20, Some(1)), [(p, true)]);
        g.link();
        assert_eq!(g.effective(c, p), Some(true));
        assert_eq!(g.flatten(c, 2), vec![Some(true), None]);
    }

    #[test]
    fn cycle_reads_as_no_opinion() {
        let mut g = RoleGraph::new();
        let p = PermissionId(0);
        let a = g.insert(role(1, 10, Some(2)), []);
        g.insert(role(2, 10, Some(1)), [(p, true)]);
        g.link();
        assert_eq!(g.chain(a), None);
        assert_eq!(g.effective(a, p), None);
        assert_eq!(g.flatten(a, 1), vec![None]);
    }

    #[test]
    fn chain_bound_is_ten_links() {
        let p = PermissionId(0);
        let build = |links: u64| {
            let mut g = RoleGraph::new();
            g.insert(role(1, 1, None), [(p, true)]);
            for id in 2..=links + 1 {
                g.insert(role(id, 1, Some(id - 1)), []);
            }
            g.link();
            g
        };
        let ok = build(MAX_INHERITANCE_DEPTH as u64);
        let leaf = ok.index_of(MAX_INHERITANCE_DEPTH as u64 + 1).unwrap();
        assert_eq!(ok.effective(leaf, p), Some(true));

        let deep = build(MAX_INHERITANCE_DEPTH as u64 + 1);
        let leaf = deep.index_of(MAX_INHERITANCE_DEPTH as u64 + 2).unwrap();
        assert_eq!(deep.chain(leaf), None);
        assert_eq!(deep.effective(leaf, p), None);
    }

    #[test]
    fn missing_parent_is_no_opinion() {
        let mut g = RoleGraph::new();
        let c = g.insert(role(2, 20, Some(99)), []);
        g.link();
        assert_eq!(g.node(c).parent, None);
        assert_eq!(g.effective(c, PermissionId(0)), None);
    }

    #[test]
    fn dependencies_follow_chain() {
        let mut g = RoleGraph::new();
        g.insert(role(1, 10, None), []);
        g.insert(role(2, 20, Some(1)), []);
        g.insert(role(3, 30, Some(2)), []);
        g.link();
        assert_eq!(g.dependencies(3), vec![3, 2, 1]);
        assert_eq!(g.dependencies(42), vec![42]);
    }
}
