//! The module -> submodule call graph.
//! Nodes are module instances, edges are bindings labelled with their role.

use crate::error::{ModuleError, Result};
use crate::module::{Module, ModuleId};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct SubmoduleGraph {
    graph: DiGraphMap<ModuleId, String>,
    names: HashMap<ModuleId, String>,
}

impl SubmoduleGraph {
    /// Walks every module reachable from `root` through bound submodules.
    /// Terminates on cyclic bindings.
    pub fn collect(root: &Module) -> Self {
        let mut graph = Self::default();
        let mut visited = HashSet::new();
        let mut stack = vec![root.clone()];

        while let Some(module) = stack.pop() {
            if !visited.insert(module.id()) {
                continue;
            }
            graph.add_module(&module);
            let config = module.snapshot();
            for (role, submodule) in config.bound_submodules() {
                graph.add_module(submodule);
                graph.graph.add_edge(module.id(), submodule.id(), role.to_string());
                stack.push(submodule.clone());
            }
        }
        graph
    }

    fn add_module(&mut self, module: &Module) {
        self.graph.add_node(module.id());
        self.names.entry(module.id()).or_insert_with(|| module.name().to_string());
    }

    pub fn module_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn binding_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.graph.contains_node(id)
    }

    /// Errors with the offending path if any module can reach itself.
    pub fn check_acyclic(&self) -> Result<()> {
        // Self-loops first; the path for them is trivial.
        if let Some((id, _, role)) = self.graph.all_edges().find(|(from, to, _)| from == to) {
            let name = self.name(id);
            return Err(ModuleError::CyclicDependency { path: vec![format!("{}.{}", name, role), name] });
        }
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(ModuleError::CyclicDependency { path: self.cycle_through(cycle.node_id()) }),
        }
    }

    /// Labelled path from `from` to `to`: every hop is rendered as
    /// `Name.role`, followed by the name of `to`. `None` if unreachable.
    pub fn path_between(&self, from: ModuleId, to: ModuleId) -> Option<Vec<String>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        let mut parents: HashMap<ModuleId, ModuleId> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        let mut seen = HashSet::from([from]);

        while let Some(node) = queue.pop_front() {
            if node == to {
                break;
            }
            for next in self.graph.neighbors(node) {
                if seen.insert(next) {
                    parents.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
        if !seen.contains(&to) {
            return None;
        }

        let mut hops = Vec::new();
        let mut current = to;
        while current != from {
            let parent = parents[&current];
            hops.push((parent, current));
            current = parent;
        }
        hops.reverse();

        let mut path: Vec<String> = hops
            .into_iter()
            .map(|(a, b)| format!("{}.{}", self.name(a), self.graph.edge_weight(a, b).map_or("", String::as_str)))
            .collect();
        path.push(self.name(to));
        Some(path)
    }

    fn cycle_through(&self, node: ModuleId) -> Vec<String> {
        for next in self.graph.neighbors(node) {
            if let Some(rest) = self.path_between(next, node) {
                let role = self.graph.edge_weight(node, next).map_or("", String::as_str);
                let mut path = vec![format!("{}.{}", self.name(node), role)];
                path.extend(rest);
                return path;
            }
        }
        vec![self.name(node)]
    }

    fn name(&self, id: ModuleId) -> String {
        self.names.get(&id).cloned().unwrap_or_else(|| id.to_string())
    }
}
