//! Native callables, overload groups and fields.

use std::sync::Arc;

use crate::{TypeHash, TypeSig};

/// Whether a callable is a constructor or a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableKind {
    Constructor,
    Method,
}

/// A single native constructor or method.
#[derive(Debug, Clone, PartialEq)]
pub struct Callable {
    /// Identity derived from owner, name and parameter types.
    pub id: TypeHash,
    pub kind: CallableKind,
    pub name: String,
    /// Full name of the declaring type.
    pub declaring_type: String,
    pub params: Vec<TypeSig>,
    pub return_type: TypeSig,
    /// The last parameter is an array that also accepts trailing arguments.
    pub is_varargs: bool,
    pub is_static: bool,
    pub is_final: bool,
}

impl Callable {
    /// Create an instance method.
    pub fn method(declaring_type: &str, name: impl Into<String>, params: Vec<TypeSig>) -> Self {
        let name = name.into();
        let owner = TypeHash::from_name(declaring_type);
        let param_hashes: Vec<_> = params.iter().map(TypeSig::type_hash).collect();
        Self {
            id: TypeHash::from_callable(owner, &name, &param_hashes),
            kind: CallableKind::Method,
            name,
            declaring_type: declaring_type.to_string(),
            params,
            return_type: TypeSig::Void,
            is_varargs: false,
            is_static: false,
            is_final: false,
        }
    }

    /// Create a constructor.
    pub fn constructor(declaring_type: &str, params: Vec<TypeSig>) -> Self {
        let owner = TypeHash::from_name(declaring_type);
        let param_hashes: Vec<_> = params.iter().map(TypeSig::type_hash).collect();
        Self {
            id: TypeHash::from_constructor(owner, &param_hashes),
            kind: CallableKind::Constructor,
            name: "new".to_string(),
            declaring_type: declaring_type.to_string(),
            params,
            return_type: TypeSig::object(declaring_type),
            is_varargs: false,
            is_static: true,
            is_final: false,
        }
    }

    // === Builder Methods ===

    pub fn returning(mut self, ty: TypeSig) -> Self {
        self.return_type = ty;
        self
    }

    /// Mark as varargs. The last parameter must be an array.
    pub fn as_varargs(mut self) -> Self {
        debug_assert!(matches!(self.params.last(), Some(TypeSig::Array(_))));
        self.is_varargs = true;
        self
    }

    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn as_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    // === Queries ===

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether `arg_count` arguments can be supplied to this callable.
    pub fn accepts_arg_count(&self, arg_count: usize) -> bool {
        let arity = self.arity();
        arity == arg_count || (self.is_varargs && arity > 0 && arity - 1 <= arg_count)
    }

    /// Parameter type a given argument position is checked against.
    ///
    /// For varargs callables positions at or past the last parameter map to the
    /// array's component type, unless `pass_array` asks for the array itself.
    pub fn param_for(&self, position: usize, pass_array: bool) -> Option<&TypeSig> {
        let last = self.params.len().checked_sub(1)?;
        if self.is_varargs && position >= last {
            let array = &self.params[last];
            if pass_array && position == last {
                return Some(array);
            }
            return array.component();
        }
        self.params.get(position)
    }

    /// `name(p1, p2, ...)`, for diagnostics.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if self.is_varargs && i + 1 == self.params.len() {
                    format!("{}...", p.component().map(|c| c.name()).unwrap_or_default())
                } else {
                    p.name()
                }
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// All callables sharing one logical name on one native type.
#[derive(Debug, Clone, PartialEq)]
pub struct CallableGroup {
    pub name: String,
    pub declaring_type: String,
    pub callables: Vec<Arc<Callable>>,
}

impl CallableGroup {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declaring_type: declaring_type.into(),
            callables: Vec::new(),
        }
    }

    pub fn push(&mut self, callable: Arc<Callable>) {
        if !self.callables.iter().any(|c| c.id == callable.id) {
            self.callables.push(callable);
        }
    }

    pub fn with(mut self, callable: Callable) -> Self {
        self.push(Arc::new(callable));
        self
    }

    pub fn len(&self) -> usize {
        self.callables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callables.is_empty()
    }

    /// Distinct arities, ascending.
    pub fn arities(&self) -> Vec<usize> {
        let mut arities: Vec<usize> = self.callables.iter().map(|c| c.arity()).collect();
        arities.sort_unstable();
        arities.dedup();
        arities
    }
}

/// A native field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub declaring_type: String,
    pub ty: TypeSig,
    pub is_static: bool,
    pub is_final: bool,
}

impl FieldDescriptor {
    pub fn new(declaring_type: &str, name: impl Into<String>, ty: TypeSig) -> Self {
        Self {
            name: name.into(),
            declaring_type: declaring_type.to_string(),
            ty,
            is_static: false,
            is_final: false,
        }
    }

    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn as_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Static final with a capitalized name; bound as a managed constant too.
    pub fn is_constant(&self) -> bool {
        self.is_static && self.is_final && self.name.chars().next().is_some_and(char::is_uppercase)
    }
}

/// Members declared directly on a native type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeMembers {
    pub constructors: Vec<Callable>,
    pub methods: Vec<Callable>,
    pub fields: Vec<FieldDescriptor>,
}

impl NativeMembers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constructor(mut self, callable: Callable) -> Self {
        self.constructors.push(callable);
        self
    }

    pub fn with_method(mut self, callable: Callable) -> Self {
        self.methods.push(callable);
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}
