use std::fmt;

use crate::TypeHash;

/// Dotted native type name split into its package and simple parts.
///
/// Nested types keep the `$` separator in their simple name, matching how the
/// reflection provider spells them.
///
/// # Examples
///
/// ```
/// use crossbind_core::QualifiedName;
///
/// let name = QualifiedName::parse("com.example.Outer$Inner");
/// assert_eq!(name.package(), &["com".to_string(), "example".to_string()]);
/// assert_eq!(name.simple_name(), "Outer$Inner");
/// assert_eq!(name.outer_name(), Some("com.example.Outer".to_string()));
/// assert_eq!(name.to_string(), "com.example.Outer$Inner");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// Simple name (e.g., "Point", "Map$Entry").
    pub name: String,
    /// Package path (e.g., ["com", "example"]). Empty for the default package.
    pub package: Vec<String>,
}

impl QualifiedName {
    /// Create a new qualified name in `package`.
    pub fn new(name: impl Into<String>, package: Vec<String>) -> Self {
        Self {
            name: name.into(),
            package,
        }
    }

    /// Create a name in the default (unnamed) package.
    pub fn top_level(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Parse a dotted name. Empty segments are dropped.
    pub fn parse(dotted: &str) -> Self {
        let mut parts: Vec<String> = dotted
            .split('.')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        let name = parts.pop().unwrap_or_default();
        Self {
            name,
            package: parts,
        }
    }

    pub fn simple_name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &[String] {
        &self.package
    }

    /// Dotted package prefix, empty for the default package.
    pub fn package_name(&self) -> String {
        self.package.join(".")
    }

    /// Whether this names a nested type (`Outer$Inner`).
    pub fn is_nested(&self) -> bool {
        self.name.contains('$')
    }

    /// Full name of the immediately enclosing type, for nested types.
    pub fn outer_name(&self) -> Option<String> {
        let (outer, _) = self.name.rsplit_once('$')?;
        Some(Self::new(outer, self.package.clone()).to_string())
    }

    /// Name of a type nested directly inside this one.
    pub fn nested(&self, inner: &str) -> Self {
        Self::new(format!("{}${}", self.name, inner), self.package.clone())
    }

    pub fn to_type_hash(&self) -> TypeHash {
        TypeHash::from_name(&self.to_string())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.package {
            write!(f, "{}.", segment)?;
        }
        write!(f, "{}", self.name)
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
