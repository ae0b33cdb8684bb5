//! Component graph construction and traversal.
//!
//! An arena of components indexed by id plus petgraph adjacency is the
//! source of truth; the nested tree views consumers see are value copies
//! derived on demand. Cycles in declared dependencies are broken and
//! reported as data, never surfaced as errors: analysis must degrade
//! gracefully on inconsistent input.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

use foreman_core::Component;

/// A dependency edge that was skipped to break a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleEdge {
    /// The component whose dependency edge was skipped.
    pub from: String,
    /// The dependency target that closed the cycle.
    pub to: String,
}

/// Result of a cycle-tolerant topological ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopoOutcome {
    /// Every component id exactly once, dependencies before dependents
    /// (modulo broken cycles).
    pub order: Vec<String>,
    /// Edges that were skipped to break cycles.
    pub cycles: Vec<CycleEdge>,
}

/// A nested value-copied view of a component and its expansion.
///
/// Trees are plain copies, not aliased references: a component reachable
/// through two paths appears once per path.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentNode {
    /// The component id this node refers to.
    pub id: String,
    /// The component data, or `None` when the id is not in the arena.
    pub component: Option<Component>,
    /// Expanded child nodes.
    pub children: Vec<ComponentNode>,
}

impl ComponentNode {
    /// Returns true if the node resolved to a known component.
    pub fn is_resolved(&self) -> bool {
        self.component.is_some()
    }

    /// Walks the node and every descendant, depth first.
    pub fn walk(&self) -> Vec<&ComponentNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.walk());
        }
        nodes
    }

    fn unresolved(id: &str) -> Self {
        Self { id: id.to_string(), component: None, children: Vec::new() }
    }
}

/// Arena of components with dependency adjacency.
#[derive(Debug, Clone)]
pub struct ComponentGraph {
    arena: HashMap<String, Component>,
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
    children: HashMap<String, Vec<String>>,
    ids: Vec<String>,
}

impl ComponentGraph {
    /// Builds a graph from a component list.
    ///
    /// Dependency edges pointing at ids missing from the list are kept in
    /// the components themselves but get no adjacency; tree expansion
    /// degrades them to unresolved leaves.
    pub fn new(components: Vec<Component>) -> Self {
        let mut arena = HashMap::new();
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        let mut ids = Vec::new();

        for component in &components {
            let node = graph.add_node(component.id.clone());
            node_map.insert(component.id.clone(), node);
            ids.push(component.id.clone());
        }
        for component in components {
            if let Some(parent) = &component.parent {
                children.entry(parent.clone()).or_default().push(component.id.clone());
            }
            arena.insert(component.id.clone(), component);
        }
        for id in &ids {
            let Some(&from) = node_map.get(id) else { continue };
            let deps = arena.get(id).and_then(|c| c.dependencies.ids());
            for target in deps.unwrap_or_default() {
                if let Some(&to) = node_map.get(target) {
                    graph.add_edge(from, to, ());
                }
            }
        }
        for child_ids in children.values_mut() {
            child_ids.sort();
        }

        Self { arena, graph, node_map, children, ids }
    }

    /// Looks up a component by id.
    pub fn get(&self, id: &str) -> Option<&Component> {
        self.arena.get(id)
    }

    /// Returns the component ids in insertion order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Returns true if the graph holds no components.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Returns the number of components in the arena.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns the direct children of a component in the hierarchy.
    pub fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map_or(&[], Vec::as_slice)
    }

    /// Orders components so dependencies come before dependents.
    ///
    /// Cycle-tolerant: an edge that would close a cycle is skipped and
    /// recorded in the outcome instead of failing the ordering. Every
    /// component in the arena appears in the order exactly once, for
    /// arbitrary input.
    pub fn topo_order(&self) -> TopoOutcome {
        let mut order = Vec::with_capacity(self.ids.len());
        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();
        let mut cycles = Vec::new();

        let mut roots: Vec<&String> = self.ids.iter().collect();
        roots.sort();
        for id in roots {
            self.topo_visit(id, &mut visited, &mut visiting, &mut order, &mut cycles);
        }

        TopoOutcome { order, cycles }
    }

    fn topo_visit(
        &self,
        id: &str,
        visited: &mut HashSet<String>,
        visiting: &mut HashSet<String>,
        order: &mut Vec<String>,
        cycles: &mut Vec<CycleEdge>,
    ) {
        if visited.contains(id) {
            return;
        }
        visiting.insert(id.to_string());

        let mut targets: Vec<&str> = self
            .node_map
            .get(id)
            .map(|&node| {
                self.graph
                    .neighbors(node)
                    .map(|n| self.graph[n].as_str())
                    .collect()
            })
            .unwrap_or_default();
        targets.sort_unstable();

        for target in targets {
            if visiting.contains(target) {
                // Revisiting a node on the current path closes a cycle;
                // skip the edge and record the break.
                cycles.push(CycleEdge { from: id.to_string(), to: target.to_string() });
            } else {
                self.topo_visit(target, visited, visiting, order, cycles);
            }
        }

        visiting.remove(id);
        visited.insert(id.to_string());
        order.push(id.to_string());
    }

    /// Expands a component's dependencies into a nested tree.
    ///
    /// Children are value copies expanded recursively. A dependency
    /// reachable through two paths is duplicated under each; a dependency
    /// already on the current ancestor path is included unexpanded to
    /// break the cycle. Ids missing from the arena become unresolved
    /// leaves.
    pub fn dependency_tree(&self, root: &str) -> ComponentNode {
        let mut path = HashSet::new();
        self.expand(root, &mut path, &|component| {
            component.dependencies.ids().map(<[String]>::to_vec).unwrap_or_default()
        })
    }

    /// Expands a component's hierarchy (parent/child) into a nested tree.
    ///
    /// Same copy, cycle and missing-id semantics as [`Self::dependency_tree`].
    pub fn hierarchy_tree(&self, root: &str) -> ComponentNode {
        let mut path = HashSet::new();
        self.expand(root, &mut path, &|component| {
            self.children_of(&component.id).to_vec()
        })
    }

    fn expand(
        &self,
        id: &str,
        path: &mut HashSet<String>,
        child_ids: &dyn Fn(&Component) -> Vec<String>,
    ) -> ComponentNode {
        let Some(component) = self.arena.get(id) else {
            return ComponentNode::unresolved(id);
        };

        path.insert(id.to_string());
        let children = child_ids(component)
            .into_iter()
            .map(|child_id| {
                if path.contains(&child_id) {
                    // Cycle: include the node without expanding it.
                    ComponentNode {
                        id: child_id.clone(),
                        component: self.arena.get(&child_id).cloned(),
                        children: Vec::new(),
                    }
                } else {
                    self.expand(&child_id, path, child_ids)
                }
            })
            .collect();
        path.remove(id);

        ComponentNode { id: id.to_string(), component: Some(component.clone()), children }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_core::{ComponentType, DependencyList};
    use pretty_assertions::assert_eq;

    fn component(id: &str, deps: &[&str]) -> Component {
        Component::new(id, id, ComponentType::Service, format!("core/{id}"))
            .with_dependencies(DependencyList::loaded(deps.iter().copied()))
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|x| x == id).unwrap()
    }

    #[test]
    fn test_empty_graph() {
        let graph = ComponentGraph::new(Vec::new());
        assert!(graph.is_empty());
        let outcome = graph.topo_order();
        assert!(outcome.order.is_empty());
        assert!(outcome.cycles.is_empty());
    }

    #[test]
    fn test_topo_order_dependencies_first() {
        let graph = ComponentGraph::new(vec![
            component("api", &["service"]),
            component("service", &["schema"]),
            component("schema", &[]),
        ]);
        let outcome = graph.topo_order();
        assert!(outcome.cycles.is_empty());
        assert_eq!(outcome.order.len(), 3);
        assert!(position(&outcome.order, "schema") < position(&outcome.order, "service"));
        assert!(position(&outcome.order, "service") < position(&outcome.order, "api"));
    }

    #[test]
    fn test_topo_order_breaks_cycles() {
        let graph = ComponentGraph::new(vec![
            component("a", &["b"]),
            component("b", &["c"]),
            component("c", &["a"]),
        ]);
        let outcome = graph.topo_order();

        // Terminates, every component exactly once, one edge broken.
        assert_eq!(outcome.order.len(), 3);
        let unique: HashSet<&String> = outcome.order.iter().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(outcome.cycles.len(), 1);
    }

    #[test]
    fn test_topo_order_self_cycle() {
        let graph = ComponentGraph::new(vec![component("a", &["a"])]);
        let outcome = graph.topo_order();
        assert_eq!(outcome.order, vec!["a".to_string()]);
        assert_eq!(
            outcome.cycles,
            vec![CycleEdge { from: "a".to_string(), to: "a".to_string() }]
        );
    }

    #[test]
    fn test_dependency_tree_nesting() {
        let graph = ComponentGraph::new(vec![
            component("api", &["service"]),
            component("service", &["schema"]),
            component("schema", &[]),
        ]);
        let tree = graph.dependency_tree("api");

        assert_eq!(tree.id, "api");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].id, "service");
        assert_eq!(tree.children[0].children[0].id, "schema");
        assert!(tree.children[0].children[0].children.is_empty());
    }

    #[test]
    fn test_dependency_tree_diamond_duplicates_shared_node() {
        let graph = ComponentGraph::new(vec![
            component("top", &["left", "right"]),
            component("left", &["shared"]),
            component("right", &["shared"]),
            component("shared", &[]),
        ]);
        let tree = graph.dependency_tree("top");

        // The tree is a copy, not an aliased DAG: shared appears twice.
        let shared_count =
            tree.walk().iter().filter(|node| node.id == "shared").count();
        assert_eq!(shared_count, 2);
    }

    #[test]
    fn test_dependency_tree_cycle_guard() {
        let graph = ComponentGraph::new(vec![
            component("a", &["b"]),
            component("b", &["a"]),
        ]);
        let tree = graph.dependency_tree("a");

        assert_eq!(tree.children.len(), 1);
        let b = &tree.children[0];
        assert_eq!(b.id, "b");
        // The back edge to a is included but not expanded.
        assert_eq!(b.children.len(), 1);
        assert_eq!(b.children[0].id, "a");
        assert!(b.children[0].children.is_empty());
    }

    #[test]
    fn test_dependency_tree_missing_id_degrades_to_leaf() {
        let graph = ComponentGraph::new(vec![component("api", &["ghost"])]);
        let tree = graph.dependency_tree("api");

        assert_eq!(tree.children.len(), 1);
        let ghost = &tree.children[0];
        assert_eq!(ghost.id, "ghost");
        assert!(!ghost.is_resolved());
        assert!(ghost.children.is_empty());
    }

    #[test]
    fn test_dependency_tree_not_loaded_has_no_children() {
        let graph = ComponentGraph::new(vec![Component::new(
            "users",
            "Users",
            ComponentType::Schema,
            "accounts/users",
        )
        .with_dependencies(DependencyList::NotLoaded)]);
        let tree = graph.dependency_tree("users");
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_hierarchy_tree() {
        let graph = ComponentGraph::new(vec![
            component("accounts", &[]),
            Component::new("users", "users", ComponentType::Schema, "accounts/users")
                .with_parent("accounts"),
            Component::new("tokens", "tokens", ComponentType::Schema, "accounts/tokens")
                .with_parent("accounts"),
            Component::new("sessions", "sessions", ComponentType::Schema, "accounts/sessions")
                .with_parent("users"),
        ]);
        let tree = graph.hierarchy_tree("accounts");

        assert_eq!(tree.children.len(), 2);
        let users = tree.children.iter().find(|n| n.id == "users").unwrap();
        assert_eq!(users.children.len(), 1);
        assert_eq!(users.children[0].id, "sessions");
    }

    #[test]
    fn test_hierarchy_tree_missing_root() {
        let graph = ComponentGraph::new(Vec::new());
        let tree = graph.hierarchy_tree("ghost");
        assert!(!tree.is_resolved());
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_walk_counts_every_node() {
        let graph = ComponentGraph::new(vec![
            component("api", &["service", "schema"]),
            component("service", &["schema"]),
            component("schema", &[]),
        ]);
        let tree = graph.dependency_tree("api");
        // api, service, schema (under service), schema (under api).
        assert_eq!(tree.walk().len(), 4);
    }
}
