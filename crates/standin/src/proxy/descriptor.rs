//! Reflection metadata for mockable types.
//!
//! A [`TypeDescriptor`] lists the members a proxy intercepts together with
//! their overridability, parameter and return type names, and how the type is
//! constructed. `#[mockable]` writes descriptors for traits; any other surface
//! can describe itself by hand.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized Rust type text, e.g. `&mut i32` or `Vec<String>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeName(String);

const INTEGERS: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
];
const STRINGS: &[&str] = &["str", "String", "char", "Cow", "PathBuf", "Path", "OsString"];
const SEQUENCES: &[&str] = &["Vec", "VecDeque", "HashSet", "BTreeSet", "LinkedList", "BinaryHeap"];
const MAPS: &[&str] = &["HashMap", "BTreeMap"];
const WRAPPERS: &[&str] = &["Box", "Rc", "Arc", "Cell", "RefCell"];

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl TypeName {
    /// Normalize `text`: whitespace survives only between two word characters
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut out = String::with_capacity(text.len());
        let mut pending_space = false;
        for c in text.chars() {
            if c.is_whitespace() {
                pending_space = true;
                continue;
            }
            if pending_space && out.chars().last().is_some_and(is_word) && is_word(c) {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
        Self(out)
    }

    /// Normalized text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `()` or no declared type
    #[must_use]
    pub fn is_unit(&self) -> bool {
        self.0.is_empty() || self.0 == "()"
    }

    /// Written as `&mut T`
    #[must_use]
    pub fn is_mut_ref(&self) -> bool {
        self.referent().1
    }

    /// The type behind any leading references and lifetimes
    #[must_use]
    pub fn strip_refs(&self) -> Self {
        Self(self.referent().0.to_string())
    }

    fn referent(&self) -> (&str, bool) {
        let mut rest = self.0.as_str();
        let mut mutable = false;
        while let Some(stripped) = rest.strip_prefix('&') {
            rest = stripped;
            if let Some(after) = rest.strip_prefix('\'') {
                rest = after.trim_start_matches(is_word).trim_start();
            }
            if let Some(after) = rest.strip_prefix("mut ") {
                rest = after;
                mutable = true;
            }
        }
        (rest, mutable)
    }

    /// Last path segment without generics: `std::vec::Vec<u8>` gives `Vec`
    #[must_use]
    pub fn head(&self) -> &str {
        let (referent, _) = self.referent();
        let path = referent.split('<').next().unwrap_or(referent);
        path.rsplit("::").next().unwrap_or(path)
    }

    /// Top-level generic arguments: `Result<Vec<u8>, E>` gives `[Vec<u8>, E]`
    #[must_use]
    pub fn generic_args(&self) -> Vec<Self> {
        let (referent, _) = self.referent();
        let (Some(open), Some(close)) = (referent.find('<'), referent.rfind('>')) else {
            return Vec::new();
        };
        if close <= open {
            return Vec::new();
        }
        split_top_level(&referent[open + 1..close])
    }

    /// Whether `value` can be returned from a member declared with this type.
    ///
    /// `Null` is always accepted; it is replaced by [`TypeName::default_value`]
    /// at dispatch time. Types the bridge cannot classify accept anything.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        let (referent, _) = self.referent();
        if referent.starts_with('[') || (referent.starts_with('(') && referent != "()") {
            return matches!(value, Value::List(_));
        }
        let head = self.head();
        let first_arg = || self.generic_args().into_iter().next();
        match head {
            "" | "()" => false,
            "Value" => true,
            "bool" => matches!(value, Value::Bool(_)),
            "f32" | "f64" => matches!(value, Value::Float(_) | Value::Int(_) | Value::UInt(_)),
            h if INTEGERS.contains(&h) => matches!(value, Value::Int(_) | Value::UInt(_)),
            h if STRINGS.contains(&h) => matches!(value, Value::Str(_)),
            h if SEQUENCES.contains(&h) => matches!(value, Value::List(_)),
            h if MAPS.contains(&h) => matches!(value, Value::Map(_)),
            "Option" | "Result" => first_arg().map_or(true, |inner| inner.accepts(value)),
            h if WRAPPERS.contains(&h) => first_arg().map_or(true, |inner| inner.accepts(value)),
            _ => true,
        }
    }

    /// Value a member of this type returns when nothing was bound
    #[must_use]
    pub fn default_value(&self) -> Value {
        let (referent, _) = self.referent();
        if referent.starts_with('[') {
            return Value::List(Vec::new());
        }
        let head = self.head();
        let first_arg = || self.generic_args().into_iter().next();
        match head {
            "bool" => Value::Bool(false),
            "f32" | "f64" => Value::Float(0.0),
            "str" | "String" | "Cow" | "PathBuf" | "Path" | "OsString" => Value::Str(String::new()),
            h if INTEGERS.contains(&h) => Value::Int(0),
            h if SEQUENCES.contains(&h) => Value::List(Vec::new()),
            h if MAPS.contains(&h) => Value::Map(std::collections::BTreeMap::new()),
            "Result" => first_arg().map_or(Value::Null, |inner| inner.default_value()),
            h if WRAPPERS.contains(&h) => first_arg().map_or(Value::Null, |inner| inner.default_value()),
            _ => Value::Null,
        }
    }
}

fn split_top_level(text: &str) -> Vec<TypeName> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(TypeName::new(&text[start..index]));
                start = index + 1;
            }
            _ => {}
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        parts.push(TypeName::new(tail));
    }
    parts
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for TypeName {
    fn from(text: String) -> Self {
        Self::new(&text)
    }
}

/// How an argument flows between caller and member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamMode {
    /// Read by the member
    #[default]
    In,
    /// Written by the member
    Out,
    /// Read and written by the member
    Ref,
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamInfo {
    /// Declared type
    pub type_name: TypeName,
    /// Flow direction
    pub mode: ParamMode,
    /// Trailing variadic segment
    pub variadic: bool,
}

impl ParamInfo {
    /// Create an input parameter
    #[must_use]
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            mode: ParamMode::In,
            variadic: false,
        }
    }

    /// Mark as output-only
    #[must_use]
    pub fn out(mut self) -> Self {
        self.mode = ParamMode::Out;
        self
    }

    /// Mark as read/write
    #[must_use]
    pub fn by_ref(mut self) -> Self {
        self.mode = ParamMode::Ref;
        self
    }

    /// Mark as the trailing variadic segment
    #[must_use]
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

/// Member flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberKind {
    /// Plain method
    Method,
    /// Property read accessor
    Getter,
    /// Property write accessor
    Setter,
    /// Indexed property accessor
    Indexer,
}

impl MemberKind {
    /// Label used in diagnostics: `"Method"` or `"Property"`
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Method => "Method",
            Self::Getter | Self::Setter | Self::Indexer => "Property",
        }
    }
}

/// One member of a mockable type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    /// Member name
    pub name: String,
    /// Member flavor
    pub kind: MemberKind,
    /// Declared parameters
    pub params: Vec<ParamInfo>,
    /// Declared return type
    pub returns: TypeName,
    /// Whether a proxy can intercept it
    pub overridable: bool,
    /// Whether a base body exists to fall through to
    pub has_base: bool,
}

impl MemberInfo {
    fn with_kind(name: &str, kind: MemberKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            params: Vec::new(),
            returns: TypeName::new("()"),
            overridable: true,
            has_base: false,
        }
    }

    /// Overridable method returning `()`
    #[must_use]
    pub fn method(name: &str) -> Self {
        Self::with_kind(name, MemberKind::Method)
    }

    /// Property getter
    #[must_use]
    pub fn getter(name: &str, type_name: impl Into<TypeName>) -> Self {
        Self::with_kind(name, MemberKind::Getter).returns(type_name)
    }

    /// Property setter
    #[must_use]
    pub fn setter(name: &str, type_name: impl Into<TypeName>) -> Self {
        Self::with_kind(name, MemberKind::Setter).param(ParamInfo::new(type_name))
    }

    /// Indexed getter
    #[must_use]
    pub fn indexer(name: &str, key: impl Into<TypeName>, returns: impl Into<TypeName>) -> Self {
        Self::with_kind(name, MemberKind::Indexer)
            .param(ParamInfo::new(key))
            .returns(returns)
    }

    /// Append a parameter
    #[must_use]
    pub fn param(mut self, param: ParamInfo) -> Self {
        self.params.push(param);
        self
    }

    /// Set the return type
    #[must_use]
    pub fn returns(mut self, type_name: impl Into<TypeName>) -> Self {
        self.returns = type_name.into();
        self
    }

    /// Mark as not interceptable
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.overridable = false;
        self
    }

    /// Mark as having a base body
    #[must_use]
    pub fn with_base(mut self) -> Self {
        self.has_base = true;
        self
    }

    /// Number of parameters before the variadic segment
    #[must_use]
    pub fn fixed_arity(&self) -> usize {
        self.params.iter().take_while(|p| !p.variadic).count()
    }

    /// Ends in a variadic segment
    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.variadic)
    }

    /// Variadic segment with no fixed leading parameters; never mockable
    #[must_use]
    pub fn is_variadic_only(&self) -> bool {
        self.is_variadic() && self.fixed_arity() == 0
    }

    /// Whether a raw call with `count` arguments lands on this member
    #[must_use]
    pub fn accepts_call_arity(&self, count: usize) -> bool {
        if self.is_variadic() {
            count >= self.fixed_arity()
        } else {
            count == self.params.len()
        }
    }

    /// Parameter types in declaration order
    pub fn param_types(&self) -> impl Iterator<Item = &TypeName> {
        self.params.iter().map(|p| &p.type_name)
    }
}

/// How instances of a mockable type come to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    /// Pure interface; always instantiable
    Interface,
    /// Concrete type with a constructor
    Class {
        /// Parameterless constructor available
        default_constructor: bool,
    },
}

/// Members and construction of a mockable type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Type name
    pub name: String,
    /// Construction kind
    pub kind: TypeKind,
    /// Declared members
    pub members: Vec<MemberInfo>,
    /// Inherited descriptors
    pub bases: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    fn with_kind(name: &str, kind: TypeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            members: Vec::new(),
            bases: Vec::new(),
        }
    }

    /// Interface descriptor
    #[must_use]
    pub fn interface(name: &str) -> Self {
        Self::with_kind(name, TypeKind::Interface)
    }

    /// Concrete class descriptor
    #[must_use]
    pub fn class(name: &str, default_constructor: bool) -> Self {
        Self::with_kind(name, TypeKind::Class { default_constructor })
    }

    /// Append a member
    #[must_use]
    pub fn member(mut self, member: MemberInfo) -> Self {
        self.members.push(member);
        self
    }

    /// Append an inherited descriptor
    #[must_use]
    pub fn base(mut self, base: Self) -> Self {
        self.bases.push(base);
        self
    }

    /// Whether the proxy can be constructed without arguments
    #[must_use]
    pub const fn is_constructible(&self) -> bool {
        match self.kind {
            TypeKind::Interface => true,
            TypeKind::Class { default_constructor } => default_constructor,
        }
    }

    /// Own members followed by inherited ones, depth first.
    ///
    /// An inherited member is shadowed by an earlier one with the same name
    /// and parameter types.
    #[must_use]
    pub fn flatten(&self) -> Vec<MemberInfo> {
        let mut members: Vec<MemberInfo> = Vec::new();
        self.collect_into(&mut members);
        members
    }

    fn collect_into(&self, members: &mut Vec<MemberInfo>) {
        for member in &self.members {
            let shadowed = members.iter().any(|m| {
                m.name == member.name && m.kind == member.kind && m.param_types().eq(member.param_types())
            });
            if !shadowed {
                members.push(member.clone());
            }
        }
        for base in &self.bases {
            base.collect_into(members);
        }
    }
}
