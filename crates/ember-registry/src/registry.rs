//! SymbolRegistry - the type and symbol oracle.
//!
//! [`SymbolRegistry`] is the central store of every type and function the
//! binder can see. Entries are stored once, keyed by [`TypeHash`]; the
//! [`NamespaceTree`] maps names to those hashes.
//!
//! # Phases
//!
//! The registry is populated by the host before compilation starts and is
//! read-only while functions are bound and emitted (`&SymbolRegistry`).
//!
//! # Example
//!
//! ```
//! use ember_core::{BasicKind, ClassEntry, DataType};
//! use ember_registry::SymbolRegistry;
//!
//! let mut registry = SymbolRegistry::with_basic_types();
//! let player = registry.register_class(ClassEntry::new("Player")).unwrap();
//!
//! assert!(registry.is_class_type(&DataType::simple(player)));
//! assert!(registry.is_basic_type(&DataType::basic(BasicKind::Int)));
//! ```

use petgraph::graph::NodeIndex;
use rustc_hash::FxHashMap;

use ember_core::{
    ArrayEntry, BasicKind, ClassEntry, ConstantValue, DataType, DelegateEntry, EnumEntry,
    FunctionEntry, FunctionTraits, IntrinsicOp, Param, RefKind, RegistrationError, Symbol,
    TypeEntry, TypeHash,
};

use crate::namespace_tree::{NamespaceData, NamespaceTree, NamespaceValue, ResolutionResult};

/// Upper bound on inheritance depth walked by the base-chain queries.
const MAX_INHERITANCE_DEPTH: usize = 256;

/// A member variable found by [`SymbolRegistry::find_field`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRef {
    /// Class that declares the field.
    pub class: TypeHash,
    /// Index among the declaring class's fields.
    pub index: u32,
    pub data_type: DataType,
}

/// Type and function registry.
#[derive(Default)]
pub struct SymbolRegistry {
    tree: NamespaceTree,
    types: FxHashMap<TypeHash, TypeEntry>,
    functions: FxHashMap<TypeHash, FunctionEntry>,
    /// Virtual function -> every function overriding it in a derived class.
    overrides: FxHashMap<TypeHash, Vec<TypeHash>>,
}

impl SymbolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the basic types and their operators registered.
    pub fn with_basic_types() -> Self {
        let mut registry = Self::new();
        registry.register_basic_types();
        registry
    }

    // ==========================================================================
    // Namespaces
    // ==========================================================================

    pub fn tree(&self) -> &NamespaceTree {
        &self.tree
    }

    /// The global namespace.
    pub fn root(&self) -> NodeIndex {
        self.tree.root()
    }

    /// Get or create a namespace by path.
    pub fn namespace<S: AsRef<str>>(&mut self, path: &[S]) -> NodeIndex {
        self.tree.get_or_create_path(path)
    }

    /// Look up an existing namespace by path.
    pub fn namespace_node<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeIndex> {
        self.tree.get_path(path)
    }

    pub fn namespace_path(&self, node: NodeIndex) -> Vec<String> {
        self.tree.namespace_path(node)
    }

    /// `using namespace target;` inside `from`.
    pub fn add_using<S: AsRef<str>, T: AsRef<str>>(&mut self, from: &[S], target: &[T]) {
        let from = self.tree.get_or_create_path(from);
        let target = self.tree.get_or_create_path(target);
        self.tree.add_using_directive(from, target);
    }

    fn namespace_data_mut(
        &mut self,
        node: NodeIndex,
    ) -> Result<&mut NamespaceData, RegistrationError> {
        self.tree
            .get_namespace_mut(node)
            .ok_or(RegistrationError::InvalidNamespace)
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    fn register_type_in<S: AsRef<str>>(
        &mut self,
        namespace: &[S],
        name: &str,
        entry: TypeEntry,
    ) -> Result<TypeHash, RegistrationError> {
        let hash = entry.hash();
        if self.types.contains_key(&hash) {
            return Err(RegistrationError::DuplicateType { name: entry.name() });
        }
        let node = self.tree.get_or_create_path(namespace);
        let data = self.namespace_data_mut(node)?;
        if data.declares(name) {
            return Err(RegistrationError::DuplicateSymbol {
                name: name.to_string(),
            });
        }
        data.types.insert(name.to_string(), hash);
        self.types.insert(hash, entry);
        Ok(hash)
    }

    /// Register a class. Its base, if any, must already be registered.
    pub fn register_class(&mut self, entry: ClassEntry) -> Result<TypeHash, RegistrationError> {
        if let Some(base) = entry.base {
            if base == entry.hash {
                return Err(RegistrationError::CircularInheritance {
                    name: entry.qualified_name(),
                });
            }
            if self.get_class(base).is_none() {
                return Err(RegistrationError::UnknownType {
                    name: format!("base of {}", entry.qualified_name()),
                });
            }
        }
        let namespace = entry.namespace.clone();
        let name = entry.name.clone();
        self.register_type_in(&namespace, &name, TypeEntry::Class(entry))
    }

    /// Register a free function, member function, constructor or destructor.
    ///
    /// A member function whose name and parameters match a virtual function
    /// of a base class overrides it, whether or not it is declared virtual.
    pub fn register_function(
        &mut self,
        mut entry: FunctionEntry,
    ) -> Result<TypeHash, RegistrationError> {
        let hash = entry.hash;
        if self.functions.contains_key(&hash) {
            return Err(RegistrationError::DuplicateFunction {
                name: entry.qualified_name(),
            });
        }

        match entry.owner {
            Some(owner) => {
                let overridden = self.overridden_by(owner, &entry);
                if !overridden.is_empty() {
                    entry.traits |= FunctionTraits::VIRTUAL | FunctionTraits::OVERRIDE;
                }
                for base_fn in overridden {
                    self.overrides.entry(base_fn).or_default().push(hash);
                }

                let is_virtual = entry.is_virtual();
                match self.types.get_mut(&owner) {
                    Some(TypeEntry::Class(class)) => {
                        if entry.is_constructor() {
                            class.constructors.push(hash);
                        } else if entry.traits.contains(FunctionTraits::DESTRUCTOR) {
                            class.destructor = Some(hash);
                        } else {
                            class.methods.push(hash);
                        }
                        if is_virtual {
                            class.is_polymorphic = true;
                        }
                    }
                    Some(TypeEntry::Array(_)) => {}
                    _ => {
                        return Err(RegistrationError::UnknownType {
                            name: format!("owner of {}", entry.name),
                        });
                    }
                }
            }
            None => {
                let node = self.tree.get_or_create_path(&entry.namespace);
                self.namespace_data_mut(node)?
                    .functions
                    .entry(entry.name.clone())
                    .or_default()
                    .push(hash);
            }
        }

        self.functions.insert(hash, entry);
        Ok(hash)
    }

    /// Virtual functions of the bases of `owner` that `entry` overrides.
    fn overridden_by(&self, owner: TypeHash, entry: &FunctionEntry) -> Vec<TypeHash> {
        if !entry.has_receiver() || entry.is_constructor() {
            return Vec::new();
        }
        let Some(base) = self.get_class(owner).and_then(|c| c.base) else {
            return Vec::new();
        };
        let signature: Vec<DataType> = entry.params[1..].iter().map(|p| p.data_type).collect();
        self.base_class_chain(base)
            .into_iter()
            .flat_map(|class| class.methods.iter())
            .filter_map(|h| self.functions.get(h))
            .filter(|f| {
                f.is_virtual()
                    && f.name == entry.name
                    && f.params.len() == entry.params.len()
                    && f.params[1..]
                        .iter()
                        .map(|p| p.data_type)
                        .eq(signature.iter().copied())
            })
            .map(|f| f.hash)
            .collect()
    }

    /// Register an enum. Its constants become visible in the enum's namespace.
    pub fn register_enum<S: AsRef<str>>(
        &mut self,
        namespace: &[S],
        entry: EnumEntry,
    ) -> Result<TypeHash, RegistrationError> {
        let name = entry.name.clone();
        let constants = entry.constants.clone();
        let hash = self.register_type_in(namespace, &name, TypeEntry::Enum(entry))?;
        let node = self.tree.get_or_create_path(namespace);
        let data = self.namespace_data_mut(node)?;
        for (constant, value) in constants {
            if data.declares(&constant) {
                return Err(RegistrationError::DuplicateSymbol { name: constant });
            }
            data.values.insert(
                constant,
                NamespaceValue::EnumConstant {
                    enum_type: hash,
                    value,
                },
            );
        }
        Ok(hash)
    }

    pub fn register_delegate<S: AsRef<str>>(
        &mut self,
        namespace: &[S],
        entry: DelegateEntry,
    ) -> Result<TypeHash, RegistrationError> {
        let name = entry.name.clone();
        self.register_type_in(namespace, &name, TypeEntry::Delegate(entry))
    }

    pub fn register_typedef<S: AsRef<str>>(
        &mut self,
        namespace: &[S],
        name: &str,
        target: DataType,
    ) -> Result<(), RegistrationError> {
        let node = self.tree.get_or_create_path(namespace);
        let data = self.namespace_data_mut(node)?;
        if data.declares(name) {
            return Err(RegistrationError::DuplicateSymbol {
                name: name.to_string(),
            });
        }
        data.typedefs.insert(name.to_string(), target);
        Ok(())
    }

    /// Register a named compile-time constant.
    pub fn register_constant<S: AsRef<str>>(
        &mut self,
        namespace: &[S],
        name: &str,
        data_type: DataType,
        value: ConstantValue,
    ) -> Result<(), RegistrationError> {
        let node = self.tree.get_or_create_path(namespace);
        let data = self.namespace_data_mut(node)?;
        if data.declares(name) {
            return Err(RegistrationError::DuplicateSymbol {
                name: name.to_string(),
            });
        }
        data.values
            .insert(name.to_string(), NamespaceValue::Constant { data_type, value });
        Ok(())
    }

    /// Register the array type `element[size]` and its element accessor.
    /// Registering the same array twice returns the existing hash.
    pub fn register_array(&mut self, element: DataType, size: u64) -> TypeHash {
        let entry = ArrayEntry::new(element, size);
        let hash = entry.hash;
        if self.types.contains_key(&hash) {
            return hash;
        }
        self.types.insert(hash, TypeEntry::Array(entry));

        let accessor = FunctionEntry::method(
            hash,
            IntrinsicOp::ArrayElement.group_name(),
            vec![Param::new("index", DataType::basic(BasicKind::Long))],
            element.with_reference(RefKind::LValue),
        )
        .with_intrinsic(IntrinsicOp::ArrayElement);
        self.functions.insert(accessor.hash, accessor);
        hash
    }

    /// Insert a built-in function, ignoring repeats.
    pub(crate) fn add_builtin(&mut self, entry: FunctionEntry) {
        if self.functions.contains_key(&entry.hash) {
            return;
        }
        let root = self.tree.root();
        if let Some(data) = self.tree.get_namespace_mut(root) {
            data.functions
                .entry(entry.name.clone())
                .or_default()
                .push(entry.hash);
        }
        self.functions.insert(entry.hash, entry);
    }

    pub(crate) fn add_basic_type(&mut self, kind: BasicKind) {
        self.types.entry(kind.hash()).or_insert(TypeEntry::Basic(kind));
    }

    // ==========================================================================
    // Entry Lookup
    // ==========================================================================

    pub fn get_type(&self, hash: TypeHash) -> Option<&TypeEntry> {
        self.types.get(&hash)
    }

    pub fn get_class(&self, hash: TypeHash) -> Option<&ClassEntry> {
        self.types.get(&hash).and_then(TypeEntry::as_class)
    }

    pub fn get_enum(&self, hash: TypeHash) -> Option<&EnumEntry> {
        self.types.get(&hash).and_then(TypeEntry::as_enum)
    }

    pub fn get_delegate(&self, hash: TypeHash) -> Option<&DelegateEntry> {
        self.types.get(&hash).and_then(TypeEntry::as_delegate)
    }

    pub fn get_array(&self, hash: TypeHash) -> Option<&ArrayEntry> {
        self.types.get(&hash).and_then(TypeEntry::as_array)
    }

    pub fn get_function(&self, hash: TypeHash) -> Option<&FunctionEntry> {
        self.functions.get(&hash)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Source-level spelling of a type, for diagnostics.
    pub fn type_name(&self, ty: &DataType) -> String {
        let base = match self.types.get(&ty.base) {
            Some(TypeEntry::Array(array)) => {
                format!("{}[{}]", self.type_name(&array.element), array.size)
            }
            Some(entry) => entry.name(),
            None => format!("<{}>", ty.base),
        };
        let mut name = String::new();
        if ty.is_const {
            name.push_str("const ");
        }
        name.push_str(&base);
        for _ in 0..ty.pointers {
            name.push('*');
        }
        match ty.reference {
            RefKind::None => {}
            RefKind::LValue => name.push('&'),
            RefKind::RValue => name.push_str("&&"),
        }
        name
    }

    /// `name(T1, T2)` for diagnostics; the receiver is shown as `C::`.
    pub fn function_signature(&self, hash: TypeHash) -> String {
        let Some(func) = self.functions.get(&hash) else {
            return format!("<{hash}>");
        };
        let (prefix, params) = match func.receiver_type() {
            Some(receiver) => (
                format!("{}::", self.type_name(&DataType::simple(receiver.base))),
                &func.params[1..],
            ),
            None => (String::new(), &func.params[..]),
        };
        let params: Vec<String> = params.iter().map(|p| self.type_name(&p.data_type)).collect();
        format!("{prefix}{}({})", func.qualified_name(), params.join(", "))
    }

    // ==========================================================================
    // Type Category Queries
    // ==========================================================================

    /// Basic kind of a non-pointer type.
    pub fn basic_kind(&self, ty: &DataType) -> Option<BasicKind> {
        if ty.pointers > 0 {
            return None;
        }
        self.types.get(&ty.base).and_then(TypeEntry::as_basic)
    }

    pub fn is_basic_type(&self, ty: &DataType) -> bool {
        self.basic_kind(ty).is_some()
    }

    /// A class value, reference or rvalue reference (not a pointer).
    pub fn is_class_type(&self, ty: &DataType) -> bool {
        ty.pointers == 0 && matches!(self.types.get(&ty.base), Some(TypeEntry::Class(_)))
    }

    pub fn is_array_type(&self, ty: &DataType) -> bool {
        ty.pointers == 0 && matches!(self.types.get(&ty.base), Some(TypeEntry::Array(_)))
    }

    pub fn is_enum_type(&self, ty: &DataType) -> bool {
        ty.pointers == 0 && matches!(self.types.get(&ty.base), Some(TypeEntry::Enum(_)))
    }

    pub fn is_delegate_type(&self, ty: &DataType) -> bool {
        ty.pointers == 0 && matches!(self.types.get(&ty.base), Some(TypeEntry::Delegate(_)))
    }

    pub fn is_pointer_type(&self, ty: &DataType) -> bool {
        ty.pointers > 0
    }

    pub fn is_reference_type(&self, ty: &DataType) -> bool {
        ty.is_reference()
    }

    pub fn is_const_reference_type(&self, ty: &DataType) -> bool {
        ty.is_const_reference()
    }

    pub fn is_rvalue_ref_type(&self, ty: &DataType) -> bool {
        ty.is_rvalue_reference()
    }

    /// The value type behind any reference or top-level const.
    pub fn base_type(&self, ty: &DataType) -> DataType {
        ty.plain()
    }

    pub fn return_type(&self, function: TypeHash) -> Option<DataType> {
        self.functions.get(&function).map(|f| f.return_type)
    }

    /// Whether the class has a vtable, declared or inherited.
    pub fn is_polymorphic(&self, class: TypeHash) -> bool {
        self.base_class_chain(class)
            .iter()
            .any(|c| c.is_polymorphic)
    }

    /// A pointer to a polymorphic class.
    pub fn is_polymorphic_pointer(&self, ty: &DataType) -> bool {
        ty.pointers == 1 && self.is_polymorphic(ty.base)
    }

    /// Storage size of a value of `ty`.
    pub fn size_of(&self, ty: &DataType) -> u64 {
        if ty.pointers > 0 || ty.is_any_reference() {
            return 8;
        }
        match self.types.get(&ty.base) {
            Some(TypeEntry::Basic(kind)) => kind.size(),
            Some(TypeEntry::Class(class)) => class.size,
            Some(TypeEntry::Array(array)) => self.size_of(&array.element) * array.size,
            Some(TypeEntry::Enum(e)) => e.underlying.size(),
            Some(TypeEntry::Delegate(_)) => 8,
            None => 0,
        }
    }

    // ==========================================================================
    // Class Queries
    // ==========================================================================

    /// The class followed by its bases, nearest first.
    pub fn base_class_chain(&self, hash: TypeHash) -> Vec<&ClassEntry> {
        let mut chain = Vec::new();
        let mut current = self.get_class(hash);
        while let Some(class) = current {
            if chain.len() >= MAX_INHERITANCE_DEPTH {
                break;
            }
            chain.push(class);
            current = class.base.and_then(|b| self.get_class(b));
        }
        chain
    }

    /// Number of inheritance steps from `derived` up to `base`.
    pub fn base_distance(&self, derived: TypeHash, base: TypeHash) -> Option<u32> {
        self.base_class_chain(derived)
            .iter()
            .position(|c| c.hash == base)
            .map(|p| p as u32)
    }

    /// Find a member variable in the class or its bases.
    pub fn find_field(&self, class: TypeHash, name: &str) -> Option<FieldRef> {
        self.base_class_chain(class).into_iter().find_map(|c| {
            c.field_index(name).map(|index| FieldRef {
                class: c.hash,
                index: index as u32,
                data_type: c.fields[index].data_type,
            })
        })
    }

    /// Member functions named `name` visible in `class`.
    ///
    /// Declarations in a derived class hide same-named functions of its
    /// bases.
    pub fn find_methods(&self, class: TypeHash, name: &str) -> Vec<TypeHash> {
        if let Some(array) = self.get_array(class) {
            return self
                .functions
                .values()
                .filter(|f| f.owner == Some(array.hash) && f.name == name)
                .map(|f| f.hash)
                .collect();
        }
        for entry in self.base_class_chain(class) {
            let found: Vec<TypeHash> = entry
                .methods
                .iter()
                .copied()
                .filter(|h| self.functions.get(h).is_some_and(|f| f.name == name))
                .collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// Whether the class (or a base) declares a member named `name`.
    pub fn has_member(&self, class: TypeHash, name: &str) -> bool {
        self.find_field(class, name).is_some() || !self.find_methods(class, name).is_empty()
    }

    pub fn constructors(&self, class: TypeHash) -> &[TypeHash] {
        self.get_class(class)
            .map(|c| c.constructors.as_slice())
            .unwrap_or(&[])
    }

    /// Destructor to run for a class value, declared or inherited.
    pub fn destructor(&self, class: TypeHash) -> Option<TypeHash> {
        self.base_class_chain(class)
            .into_iter()
            .find_map(|c| c.destructor)
    }

    /// Destructor to run for a value of `ty`, if it is a destructible class value.
    pub fn destructor_of(&self, ty: &DataType) -> Option<TypeHash> {
        if ty.pointers > 0 || ty.is_any_reference() {
            return None;
        }
        self.destructor(ty.base)
    }

    /// User-defined conversion functions of the class and its bases.
    pub fn conversion_functions(&self, class: TypeHash) -> Vec<&FunctionEntry> {
        self.base_class_chain(class)
            .into_iter()
            .flat_map(|c| c.methods.iter())
            .filter_map(|h| self.functions.get(h))
            .filter(|f| f.traits.contains(FunctionTraits::CONVERSION))
            .collect()
    }

    /// Functions overriding the virtual function `function`, at any depth.
    pub fn override_set(&self, function: TypeHash) -> &[TypeHash] {
        self.overrides
            .get(&function)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ==========================================================================
    // Name Lookup
    // ==========================================================================

    /// Resolve an unqualified name used in namespace `from`.
    ///
    /// Only namespace-level symbols are produced here; locals, parameters
    /// and members come from the binder's own scopes.
    pub fn lookup(&self, name: &str, from: NodeIndex) -> ResolutionResult<Symbol> {
        let tree = &self.tree;
        self.tree.resolve(
            from,
            |node, data| {
                self.symbol_in(data, name).or_else(|| {
                    tree.find_child(node, name)
                        .map(|ns| Symbol::Namespace(tree.namespace_path(ns)))
                })
            },
            |a, b| match (a, b) {
                (Symbol::FunctionGroup { .. }, Symbol::FunctionGroup { .. }) => true,
                _ => a == b,
            },
        )
    }

    /// Resolve a name declared directly in namespace `ns` (qualified lookup).
    pub fn lookup_in(&self, ns: NodeIndex, name: &str) -> Option<Symbol> {
        let data = self.tree.get_namespace(ns)?;
        self.symbol_in(data, name).or_else(|| {
            self.tree
                .find_child(ns, name)
                .map(|child| Symbol::Namespace(self.tree.namespace_path(child)))
        })
    }

    fn symbol_in(&self, data: &NamespaceData, name: &str) -> Option<Symbol> {
        if let Some(value) = data.values.get(name) {
            return Some(match value {
                NamespaceValue::Constant { data_type, value } => Symbol::Constant {
                    name: name.to_string(),
                    data_type: *data_type,
                    value: value.clone(),
                },
                NamespaceValue::EnumConstant { enum_type, value } => Symbol::EnumConstant {
                    enum_type: *enum_type,
                    value: value.clone(),
                },
            });
        }
        if let Some(hash) = data.types.get(name) {
            return match self.types.get(hash)? {
                TypeEntry::Class(_) => Some(Symbol::Class(*hash)),
                TypeEntry::Enum(_) => Some(Symbol::Enum(*hash)),
                TypeEntry::Delegate(_) => Some(Symbol::Delegate(*hash)),
                TypeEntry::Basic(_) | TypeEntry::Array(_) => None,
            };
        }
        if let Some(target) = data.typedefs.get(name) {
            return Some(Symbol::Typedef {
                name: name.to_string(),
                target: *target,
            });
        }
        data.functions
            .get(name)
            .map(|functions| Symbol::FunctionGroup {
                name: name.to_string(),
                functions: functions.clone(),
                class: None,
            })
    }

    /// Free functions named `name` visible from `from`: the enclosing
    /// namespaces and every `using` import, duplicates removed.
    pub fn free_functions(&self, name: &str, from: NodeIndex) -> Vec<TypeHash> {
        let mut found = Vec::new();
        for scope in self.tree.lookup_scopes(from) {
            let Some(group) = self
                .tree
                .get_namespace(scope)
                .and_then(|data| data.functions.get(name))
            else {
                continue;
            };
            for hash in group {
                if !found.contains(hash) {
                    found.push(*hash);
                }
            }
        }
        found
    }

    /// Resolve a type name used in `from`: basic names, classes, enums,
    /// delegates and typedefs.
    pub fn resolve_type_name(&self, name: &str, from: NodeIndex) -> ResolutionResult<DataType> {
        if let Some(kind) = BasicKind::ALL.into_iter().find(|k| k.name() == name) {
            return ResolutionResult::Found(DataType::basic(kind));
        }
        self.tree.resolve(
            from,
            |_, data| {
                data.types
                    .get(name)
                    .map(|h| DataType::simple(*h))
                    .or_else(|| data.typedefs.get(name).copied())
            },
            |a, b| a == b,
        )
    }

    /// Resolve `ns::name` where `ns` is a namespace path relative to `from`.
    pub fn resolve_qualified<S: AsRef<str>>(
        &self,
        path: &[S],
        name: &str,
        from: NodeIndex,
    ) -> Option<Symbol> {
        let (first, rest) = path.split_first()?;
        let mut ns = self.tree.resolve_namespace(from, first.as_ref()).ok()?;
        for segment in rest {
            ns = self.tree.find_child(ns, segment.as_ref())?;
        }
        self.lookup_in(ns, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::FieldEntry;

    fn int() -> DataType {
        DataType::basic(BasicKind::Int)
    }

    fn hierarchy() -> (SymbolRegistry, TypeHash, TypeHash, TypeHash) {
        let mut registry = SymbolRegistry::with_basic_types();
        let a = registry
            .register_class(ClassEntry::new("A").with_field("x", int()))
            .unwrap();
        let b = registry
            .register_class(ClassEntry::new("B").with_base(a))
            .unwrap();
        let c = registry
            .register_class(ClassEntry::new("C").with_base(b).with_field("y", int()))
            .unwrap();
        (registry, a, b, c)
    }

    #[test]
    fn duplicate_class_is_rejected() {
        let mut registry = SymbolRegistry::new();
        registry.register_class(ClassEntry::new("A")).unwrap();
        assert!(matches!(
            registry.register_class(ClassEntry::new("A")),
            Err(RegistrationError::DuplicateType { .. })
        ));
    }

    #[test]
    fn self_inheritance_is_circular() {
        let mut registry = SymbolRegistry::new();
        let hash = TypeHash::from_name("A");
        assert!(matches!(
            registry.register_class(ClassEntry::new("A").with_base(hash)),
            Err(RegistrationError::CircularInheritance { .. })
        ));
    }

    #[test]
    fn unknown_base_is_rejected() {
        let mut registry = SymbolRegistry::new();
        let result = registry.register_class(ClassEntry::new("A").with_base(TypeHash::from_name("Z")));
        assert!(matches!(result, Err(RegistrationError::UnknownType { .. })));
    }

    #[test]
    fn base_chain_and_distance() {
        let (registry, a, b, c) = hierarchy();
        let chain: Vec<_> = registry.base_class_chain(c).iter().map(|e| e.hash).collect();
        assert_eq!(chain, vec![c, b, a]);
        assert_eq!(registry.base_distance(c, a), Some(2));
        assert_eq!(registry.base_distance(a, c), None);
    }

    #[test]
    fn inherited_field_reports_declaring_class() {
        let (registry, a, _, c) = hierarchy();
        let field = registry.find_field(c, "x").unwrap();
        assert_eq!(field.class, a);
        assert_eq!(field.index, 0);
        assert_eq!(
            registry.find_field(c, "y").map(|f| f.class),
            Some(c)
        );
        assert!(registry.find_field(a, "y").is_none());
    }

    #[test]
    fn override_detection_and_polymorphism() {
        let (mut registry, a, b, c) = hierarchy();
        let base_f = registry
            .register_function(
                FunctionEntry::method(a, "f", vec![], int()).with_traits(FunctionTraits::VIRTUAL),
            )
            .unwrap();
        let mid_f = registry
            .register_function(FunctionEntry::method(b, "f", vec![], int()))
            .unwrap();
        let leaf_f = registry
            .register_function(FunctionEntry::method(c, "f", vec![], int()))
            .unwrap();

        assert!(registry.is_polymorphic(c));
        assert!(registry.get_function(mid_f).unwrap().is_virtual());
        assert_eq!(registry.override_set(base_f), &[mid_f, leaf_f]);
        assert_eq!(registry.override_set(mid_f), &[leaf_f]);
    }

    #[test]
    fn derived_methods_hide_base_methods() {
        let (mut registry, a, _, c) = hierarchy();
        let base_g = registry
            .register_function(FunctionEntry::method(a, "g", vec![], int()))
            .unwrap();
        let leaf_g = registry
            .register_function(FunctionEntry::method(
                c,
                "g",
                vec![Param::new("v", int())],
                int(),
            ))
            .unwrap();
        assert_eq!(registry.find_methods(c, "g"), vec![leaf_g]);
        assert_eq!(registry.find_methods(a, "g"), vec![base_g]);
    }

    #[test]
    fn inherited_destructor_is_found() {
        let (mut registry, a, _, c) = hierarchy();
        let dtor = registry
            .register_function(FunctionEntry::destructor(a))
            .unwrap();
        assert_eq!(registry.destructor(c), Some(dtor));
        assert_eq!(registry.destructor_of(&DataType::simple(c).pointer_to()), None);
    }

    #[test]
    fn lookup_dispatches_symbol_kinds() {
        let mut registry = SymbolRegistry::with_basic_types();
        registry
            .register_constant(&["Game"], "MAX", int(), ConstantValue::Int(10))
            .unwrap();
        let color = registry
            .register_enum(
                &["Game"],
                EnumEntry::new("Color", BasicKind::Int).with_constant("Red", 0),
            )
            .unwrap();
        registry
            .register_typedef(&["Game"], "Score", DataType::basic(BasicKind::Long))
            .unwrap();
        let game = registry.namespace_node(&["Game"]).unwrap();

        assert!(matches!(
            registry.lookup("MAX", game).ok(),
            Some(Symbol::Constant { .. })
        ));
        assert_eq!(registry.lookup("Color", game).ok(), Some(Symbol::Enum(color)));
        assert!(matches!(
            registry.lookup("Red", game).ok(),
            Some(Symbol::EnumConstant { enum_type, .. }) if enum_type == color
        ));
        assert!(matches!(
            registry.lookup("Score", game).ok(),
            Some(Symbol::Typedef { .. })
        ));
        assert_eq!(
            registry.lookup("Game", registry.root()).ok(),
            Some(Symbol::Namespace(vec!["Game".to_string()]))
        );
        assert!(registry.lookup("Nope", game).is_not_found());
    }

    #[test]
    fn free_functions_gathered_from_imports() {
        let mut registry = SymbolRegistry::with_basic_types();
        let local = registry
            .register_function(FunctionEntry::free("log", vec![], DataType::void()))
            .unwrap();
        let imported = registry
            .register_function(
                FunctionEntry::free("log", vec![Param::new("v", int())], DataType::void())
                    .in_namespace(&["Lib"]),
            )
            .unwrap();
        registry.add_using(&[] as &[&str], &["Lib"]);

        let found = registry.free_functions("log", registry.root());
        assert_eq!(found, vec![local, imported]);
    }

    #[test]
    fn qualified_lookup() {
        let mut registry = SymbolRegistry::new();
        let class = registry
            .register_class(ClassEntry::new("Player").in_namespace(&["Game", "World"]))
            .unwrap();
        let found = registry.resolve_qualified(&["Game", "World"], "Player", registry.root());
        assert_eq!(found, Some(Symbol::Class(class)));
    }

    #[test]
    fn type_names_for_diagnostics() {
        let (registry, a, _, _) = hierarchy();
        let r = DataType::simple(a).with_const().with_reference(RefKind::LValue);
        assert_eq!(registry.type_name(&r), "const A&");
        assert_eq!(registry.type_name(&int().pointer_to()), "int*");
    }

    #[test]
    fn array_registration_is_idempotent_and_has_accessor() {
        let mut registry = SymbolRegistry::with_basic_types();
        let first = registry.register_array(int(), 4);
        let second = registry.register_array(int(), 4);
        assert_eq!(first, second);
        assert!(registry.is_array_type(&DataType::simple(first)));
        let accessor = registry.find_methods(first, "operator[]");
        assert_eq!(accessor.len(), 1);
        assert_eq!(registry.size_of(&DataType::simple(first)), 16);
    }

    #[test]
    fn size_of_class_uses_declared_size() {
        let mut registry = SymbolRegistry::new();
        let mut entry = ClassEntry::new("P").with_size(24);
        entry.fields.push(FieldEntry {
            name: "a".into(),
            data_type: int(),
        });
        let p = registry.register_class(entry).unwrap();
        assert_eq!(registry.size_of(&DataType::simple(p)), 24);
    }
}
