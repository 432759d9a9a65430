//! Namespace Tree - hierarchical storage of names.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: `NamespaceData` (the names declared at that level)
//! - Edges: `Contains(name)` for hierarchy, `Uses` for `using namespace`
//!
//! The tree only maps names to identities; the entries themselves live in
//! the [`SymbolRegistry`](crate::SymbolRegistry) tables keyed by hash.

use ember_core::{ConstantValue, DataType, TypeHash};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;

/// Result of name resolution that may be ambiguous.
///
/// When multiple `using namespace` directives bring the same name into scope,
/// resolution is ambiguous and must be reported as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionResult<T> {
    /// Found exactly one match.
    Found(T),
    /// Found in several namespaces imported by `using` directives.
    Ambiguous(Vec<(NodeIndex, T)>),
    /// Not found in any searched location.
    NotFound,
}

impl<T> ResolutionResult<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, ResolutionResult::Found(_))
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, ResolutionResult::Ambiguous(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolutionResult::NotFound)
    }

    /// Convert to Option, returning Some for Found, None otherwise.
    pub fn ok(self) -> Option<T> {
        match self {
            ResolutionResult::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ResolutionResult<U> {
        match self {
            ResolutionResult::Found(v) => ResolutionResult::Found(f(v)),
            ResolutionResult::Ambiguous(v) => {
                ResolutionResult::Ambiguous(v.into_iter().map(|(n, t)| (n, f(t))).collect())
            }
            ResolutionResult::NotFound => ResolutionResult::NotFound,
        }
    }
}

/// Edge types in the namespace graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceEdge {
    /// Parent namespace contains child namespace.
    /// The String is the child's simple name.
    Contains(String),
    /// `using namespace` directive.
    /// Source namespace imports target namespace for resolution.
    Uses,
}

/// A named value declared at namespace level.
#[derive(Debug, Clone, PartialEq)]
pub enum NamespaceValue {
    Constant {
        data_type: DataType,
        value: ConstantValue,
    },
    /// Enumerators are visible unqualified in the enum's namespace.
    EnumConstant {
        enum_type: TypeHash,
        value: ConstantValue,
    },
}

/// Names declared directly in one namespace.
#[derive(Debug, Default)]
pub struct NamespaceData {
    /// Classes, enums and delegates by simple name.
    pub types: FxHashMap<String, TypeHash>,
    /// Free function overloads by simple name.
    pub functions: FxHashMap<String, Vec<TypeHash>>,
    /// Constants and enumerators by simple name.
    pub values: FxHashMap<String, NamespaceValue>,
    /// Typedefs by simple name.
    pub typedefs: FxHashMap<String, DataType>,
}

impl NamespaceData {
    /// Whether anything (other than a child namespace) is declared as `name`.
    pub fn declares(&self, name: &str) -> bool {
        self.types.contains_key(name)
            || self.functions.contains_key(name)
            || self.values.contains_key(name)
            || self.typedefs.contains_key(name)
    }
}

/// The namespace graph - hierarchical storage for all names.
pub struct NamespaceTree {
    graph: DiGraph<NamespaceData, NamespaceEdge>,
    root: NodeIndex,
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTree {
    /// Create a new namespace tree with an empty root.
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(NamespaceData::default());
        Self { graph, root }
    }

    /// The global namespace.
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn get_namespace(&self, node: NodeIndex) -> Option<&NamespaceData> {
        self.graph.node_weight(node)
    }

    pub fn get_namespace_mut(&mut self, node: NodeIndex) -> Option<&mut NamespaceData> {
        self.graph.node_weight_mut(node)
    }

    /// Find a child namespace by name.
    pub fn find_child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.graph.edges(parent).find_map(|edge| match edge.weight() {
            NamespaceEdge::Contains(child) if child == name => Some(edge.target()),
            _ => None,
        })
    }

    /// Get or create a child namespace.
    pub fn get_or_create_child(&mut self, parent: NodeIndex, name: &str) -> NodeIndex {
        if let Some(child) = self.find_child(parent, name) {
            return child;
        }
        let child = self.graph.add_node(NamespaceData::default());
        self.graph
            .add_edge(parent, child, NamespaceEdge::Contains(name.to_string()));
        child
    }

    /// Get or create a namespace path from root.
    pub fn get_or_create_path<S: AsRef<str>>(&mut self, path: &[S]) -> NodeIndex {
        let mut current = self.root;
        for segment in path {
            current = self.get_or_create_child(current, segment.as_ref());
        }
        current
    }

    /// Get an existing namespace by path from root.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeIndex> {
        let mut current = self.root;
        for segment in path {
            current = self.find_child(current, segment.as_ref())?;
        }
        Some(current)
    }

    /// Find the parent namespace of a node.
    pub fn find_parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .find(|edge| matches!(edge.weight(), NamespaceEdge::Contains(_)))
            .map(|edge| edge.source())
    }

    /// Simple name of a namespace node; `None` for the root.
    pub fn namespace_name(&self, node: NodeIndex) -> Option<&str> {
        if node == self.root {
            return None;
        }
        self.graph
            .edges_directed(node, Direction::Incoming)
            .find_map(|edge| match edge.weight() {
                NamespaceEdge::Contains(name) => Some(name.as_str()),
                NamespaceEdge::Uses => None,
            })
    }

    /// Full path of a namespace node.
    pub fn namespace_path(&self, node: NodeIndex) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = node;
        while current != self.root {
            if let Some(name) = self.namespace_name(current) {
                path.push(name.to_string());
            }
            match self.find_parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Add a `using namespace` directive.
    pub fn add_using_directive(&mut self, from_ns: NodeIndex, target_ns: NodeIndex) {
        let exists = self
            .graph
            .edges(from_ns)
            .any(|edge| matches!(edge.weight(), NamespaceEdge::Uses) && edge.target() == target_ns);
        if !exists {
            self.graph.add_edge(from_ns, target_ns, NamespaceEdge::Uses);
        }
    }

    /// Namespaces imported via `using namespace` directly into `ns`.
    pub fn using_directives(&self, ns: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .edges(ns)
            .filter(|edge| matches!(edge.weight(), NamespaceEdge::Uses))
            .map(|edge| edge.target())
            .collect()
    }

    /// The namespace itself followed by its ancestors up to the root.
    pub fn enclosing(&self, from: NodeIndex) -> Vec<NodeIndex> {
        let mut chain = Vec::new();
        let mut current = Some(from);
        while let Some(node) = current {
            chain.push(node);
            current = self.find_parent(node);
        }
        chain
    }

    /// Every namespace searched for an unqualified name used in `from`:
    /// the enclosing chain innermost first, then the namespaces imported by
    /// `using` at any level of that chain (imports are not transitive).
    pub fn lookup_scopes(&self, from: NodeIndex) -> Vec<NodeIndex> {
        let chain = self.enclosing(from);
        let mut scopes = chain.clone();
        for node in chain {
            for imported in self.using_directives(node) {
                if !scopes.contains(&imported) {
                    scopes.push(imported);
                }
            }
        }
        scopes
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve an unqualified name from `from`.
    ///
    /// Search order:
    /// 1. Current namespace
    /// 2. Parent namespaces (walking up to root)
    /// 3. Namespaces imported via `using namespace` at current and parent
    ///    scopes (non-transitive). Hits in more than one imported namespace
    ///    are ambiguous unless `same` says they denote the same entity.
    pub fn resolve<'a, T>(
        &'a self,
        from: NodeIndex,
        pick: impl Fn(NodeIndex, &'a NamespaceData) -> Option<T>,
        same: impl Fn(&T, &T) -> bool,
    ) -> ResolutionResult<T> {
        let chain = self.enclosing(from);
        for &node in &chain {
            if let Some(found) = self.graph.node_weight(node).and_then(|d| pick(node, d)) {
                return ResolutionResult::Found(found);
            }
        }

        let mut matches: Vec<(NodeIndex, T)> = Vec::new();
        for &node in &chain {
            for imported in self.using_directives(node) {
                if matches.iter().any(|(n, _)| *n == imported) {
                    continue;
                }
                let Some(found) = self.graph.node_weight(imported).and_then(|d| pick(imported, d))
                else {
                    continue;
                };
                if !matches.iter().any(|(_, existing)| same(existing, &found)) {
                    matches.push((imported, found));
                }
            }
        }

        match matches.len() {
            0 => ResolutionResult::NotFound,
            1 => match matches.pop() {
                Some((_, found)) => ResolutionResult::Found(found),
                None => ResolutionResult::NotFound,
            },
            _ => ResolutionResult::Ambiguous(matches),
        }
    }

    /// Resolve a namespace name used in `from` (`A` in `A::f`).
    pub fn resolve_namespace(&self, from: NodeIndex, name: &str) -> ResolutionResult<NodeIndex> {
        self.resolve(
            from,
            |node, _| self.find_child(node, name),
            |a, b| a == b,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_type(path: &[&str], name: &str) -> NamespaceTree {
        let mut tree = NamespaceTree::new();
        let node = tree.get_or_create_path(path);
        if let Some(data) = tree.get_namespace_mut(node) {
            data.types.insert(name.to_string(), TypeHash::from_name(name));
        }
        tree
    }

    fn pick_type<'a>(name: &'a str) -> impl Fn(NodeIndex, &NamespaceData) -> Option<TypeHash> + 'a {
        move |_, data| data.types.get(name).copied()
    }

    #[test]
    fn path_round_trip() {
        let mut tree = NamespaceTree::new();
        let node = tree.get_or_create_path(&["Game", "World"]);
        assert_eq!(tree.namespace_path(node), vec!["Game", "World"]);
        assert_eq!(tree.get_path(&["Game", "World"]), Some(node));
        assert_eq!(tree.get_path(&["Nope"]), None);
        assert_eq!(tree.namespace_path(tree.root()), Vec::<String>::new());
    }

    #[test]
    fn resolve_walks_up_to_parents() {
        let mut tree = tree_with_type(&[], "Player");
        let inner = tree.get_or_create_path(&["A", "B"]);
        let found = tree.resolve(inner, pick_type("Player"), |a, b| a == b);
        assert_eq!(found, ResolutionResult::Found(TypeHash::from_name("Player")));
    }

    #[test]
    fn inner_declaration_hides_outer() {
        let mut tree = tree_with_type(&[], "T");
        let inner = tree.get_or_create_path(&["A"]);
        if let Some(data) = tree.get_namespace_mut(inner) {
            data.types.insert("T".to_string(), TypeHash::from_name("A::T"));
        }
        let found = tree.resolve(inner, pick_type("T"), |a, b| a == b);
        assert_eq!(found, ResolutionResult::Found(TypeHash::from_name("A::T")));
    }

    #[test]
    fn using_directive_imports_names() {
        let mut tree = tree_with_type(&["Lib"], "Vec3");
        let lib = tree.get_path(&["Lib"]).unwrap();
        let app = tree.get_or_create_path(&["App"]);
        assert!(tree.resolve(app, pick_type("Vec3"), |a, b| a == b).is_not_found());

        tree.add_using_directive(app, lib);
        tree.add_using_directive(app, lib);
        assert_eq!(tree.using_directives(app).len(), 1);
        assert!(tree.resolve(app, pick_type("Vec3"), |a, b| a == b).is_found());
    }

    #[test]
    fn two_imports_of_same_name_are_ambiguous() {
        let mut tree = NamespaceTree::new();
        let a = tree.get_or_create_path(&["A"]);
        let b = tree.get_or_create_path(&["B"]);
        tree.get_namespace_mut(a)
            .unwrap()
            .types
            .insert("T".to_string(), TypeHash::from_name("A::T"));
        tree.get_namespace_mut(b)
            .unwrap()
            .types
            .insert("T".to_string(), TypeHash::from_name("B::T"));
        let root = tree.root();
        tree.add_using_directive(root, a);
        tree.add_using_directive(root, b);

        assert!(tree.resolve(root, pick_type("T"), |x, y| x == y).is_ambiguous());
    }

    #[test]
    fn lookup_scopes_lists_chain_then_imports() {
        let mut tree = NamespaceTree::new();
        let lib = tree.get_or_create_path(&["Lib"]);
        let inner = tree.get_or_create_path(&["App", "Inner"]);
        let root = tree.root();
        tree.add_using_directive(root, lib);

        let scopes = tree.lookup_scopes(inner);
        assert_eq!(scopes.first(), Some(&inner));
        assert_eq!(scopes.last(), Some(&lib));
        assert!(scopes.contains(&root));
    }

    #[test]
    fn resolve_namespace_by_name() {
        let mut tree = NamespaceTree::new();
        let game = tree.get_or_create_path(&["Game"]);
        let inner = tree.get_or_create_path(&["Other"]);
        assert_eq!(
            tree.resolve_namespace(inner, "Game"),
            ResolutionResult::Found(game)
        );
    }
}
