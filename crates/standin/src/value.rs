//! Dynamic values carried through intercepted calls.
//!
//! Arguments, canned results and out-parameter payloads all travel through the
//! engine as [`Value`]. Any `serde` type converts in with [`Value::encode`] and
//! back out with [`Value::decode`]; the bridge goes through `serde_json`.

use crate::result::{MockError, MockResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Coarse classification of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Absent value
    Null,
    /// Boolean
    Bool,
    /// Integer, signed or unsigned
    Int,
    /// Floating point number
    Float,
    /// Text
    Str,
    /// Ordered sequence
    List,
    /// String-keyed record
    Map,
    /// Reference-identity object
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "string",
            Self::List => "list",
            Self::Map => "map",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Shared object compared by reference identity rather than by content.
///
/// Use this for arguments such as other stand-ins, where two handles are only
/// "equal" when they point at the same instance.
#[derive(Clone)]
pub struct ObjectRef {
    inner: Rc<dyn Any>,
    type_name: &'static str,
}

impl ObjectRef {
    /// Wrap a shared object
    #[must_use]
    pub fn new<T: Any>(object: Rc<T>) -> Self {
        Self {
            inner: object,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Rust type name of the wrapped object
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Recover the concrete object
    #[must_use]
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Whether both handles point at the same instance
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.type_name)
    }
}

/// A dynamically typed argument or result
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value; also the lenient "default" result
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer above `i64::MAX`
    UInt(u64),
    /// Floating point number
    Float(f64),
    /// Text
    Str(String),
    /// Ordered sequence (vectors, slices, tuples, collapsed variadic tails)
    List(Vec<Value>),
    /// String-keyed record (structs, maps)
    Map(BTreeMap<String, Value>),
    /// Object compared by identity
    Object(ObjectRef),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Int(a), Self::UInt(b)) | (Self::UInt(b), Self::Int(a)) => {
                u64::try_from(*a).is_ok_and(|a| a == *b)
            }
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Value {
    /// Wrap a shared object as an identity-compared value
    #[must_use]
    pub fn object<T: Any>(object: Rc<T>) -> Self {
        Self::Object(ObjectRef::new(object))
    }

    /// Convert any serializable value
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> MockResult<Self> {
        Ok(Self::from_json(serde_json::to_value(value)?))
    }

    /// Convert back into a concrete type
    pub fn decode<T: DeserializeOwned>(self) -> MockResult<T> {
        Ok(serde_json::from_value(self.into_json()?)?)
    }

    /// Classify this value
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) | Self::UInt(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
            Self::Object(_) => ValueKind::Object,
        }
    }

    /// Whether this is [`Value::Null`]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text of a string value
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, when it fits an `i64`
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Integer content, when it fits a `u64`
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int(i) => u64::try_from(*i).ok(),
            Self::UInt(u) => Some(*u),
            _ => None,
        }
    }

    /// Numeric content, widening integers
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::UInt(u) => Some(*u as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean content
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the items of a list value
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the fields of a map value
    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(fields) => Some(fields),
            _ => None,
        }
    }

    fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(fields) => Self::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    fn into_json(self) -> MockResult<serde_json::Value> {
        Ok(match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(b),
            Self::Int(i) => serde_json::Value::from(i),
            Self::UInt(u) => serde_json::Value::from(u),
            Self::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| MockError::Conversion {
                    message: format!("non-finite float {f} has no serialized form"),
                })?,
            Self::Str(s) => serde_json::Value::String(s),
            Self::List(items) => serde_json::Value::Array(
                items
                    .into_iter()
                    .map(Self::into_json)
                    .collect::<MockResult<_>>()?,
            ),
            Self::Map(fields) => serde_json::Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| Ok((k, v.into_json()?)))
                    .collect::<MockResult<_>>()?,
            ),
            Self::Object(object) => {
                return Err(MockError::Conversion {
                    message: format!(
                        "object reference <{}> cannot be decoded by value",
                        object.type_name()
                    ),
                })
            }
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(fields) => {
                f.write_str("{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Self::Object(object) => write!(f, "<{}>", object.type_name()),
        }
    }
}

macro_rules! impl_from_lossless_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_lossless_int!(i8, i16, i32, i64, u8, u16, u32);

// Non-negative values that fit an `i64` stay `Int`, so equal numbers share one form
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::UInt(v), Self::Int)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::from(v as u64)
    }
}

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Null
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Self::Object(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

/// Build a `Vec<Value>` of call arguments
///
/// ```
/// use standin::{vals, Value};
///
/// let args = vals!["abc", 3, Value::Null];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! vals {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    mod conversion_tests {
        use super::*;

        #[test]
        fn test_primitive_from() {
            assert_eq!(Value::from(3_u8), Value::Int(3));
            assert_eq!(Value::from(-7_i64), Value::Int(-7));
            assert_eq!(Value::from(u64::MAX), Value::UInt(u64::MAX));
            assert_eq!(Value::from(7_u64), Value::Int(7));
            assert_eq!(Value::from(usize::MAX).as_u64(), Some(usize::MAX as u64));
            assert_eq!(Value::from("hi"), Value::Str("hi".to_string()));
            assert_eq!(Value::from(()), Value::Null);
            assert_eq!(Value::from(None::<i32>), Value::Null);
            assert_eq!(Value::from(Some(2)), Value::Int(2));
        }

        #[test]
        fn test_encode_struct_as_map() {
            let value = Value::encode(&Point { x: 1, y: 2 }).unwrap();
            let fields = value.as_map().unwrap();
            assert_eq!(fields.get("x"), Some(&Value::Int(1)));
            assert_eq!(fields.get("y"), Some(&Value::Int(2)));
        }

        #[test]
        fn test_decode_struct() {
            let value = Value::encode(&Point { x: 4, y: -1 }).unwrap();
            let point: Point = value.decode().unwrap();
            assert_eq!(point, Point { x: 4, y: -1 });
        }

        #[test]
        fn test_decode_wrong_shape_fails() {
            let result: MockResult<i32> = Value::from("nope").decode();
            assert!(matches!(result, Err(MockError::Json(_))));
        }

        #[test]
        fn test_decode_object_fails() {
            let result: MockResult<i32> = Value::object(Rc::new(5_u8)).decode();
            assert!(matches!(result, Err(MockError::Conversion { .. })));
        }

        #[test]
        fn test_wide_unsigned_round_trips() {
            let value = Value::encode(&u64::MAX).unwrap();
            assert_eq!(value, Value::UInt(u64::MAX));
            assert_eq!(value.decode::<u64>().unwrap(), u64::MAX);
            let ids: Vec<u64> = Value::encode(&vec![1_u64, u64::MAX - 1])
                .unwrap()
                .decode()
                .unwrap();
            assert_eq!(ids, vec![1, u64::MAX - 1]);
        }

        #[test]
        fn test_non_finite_float_fails() {
            let result: MockResult<f64> = Value::Float(f64::NAN).decode();
            assert!(result.is_err());
        }
    }

    mod equality_tests {
        use super::*;

        #[test]
        fn test_structural_equality() {
            assert_eq!(vals![1, "a"], vals![1, "a"]);
            assert_ne!(Value::Int(1), Value::Float(1.0));
            assert_ne!(Value::Null, Value::Bool(false));
        }

        #[test]
        fn test_wide_unsigned_equality() {
            assert_ne!(Value::from(u64::MAX), Value::from(u64::MAX - 1));
            assert_eq!(Value::UInt(5), Value::Int(5));
            assert_ne!(Value::UInt(u64::MAX), Value::Int(-1));
            assert_eq!(Value::from(u64::MAX).to_string(), u64::MAX.to_string());
            assert_eq!(Value::from(u64::MAX).kind(), ValueKind::Int);
        }

        #[test]
        fn test_object_identity() {
            let shared = Rc::new(String::from("same"));
            let a = Value::object(Rc::clone(&shared));
            let b = Value::object(shared);
            let c = Value::object(Rc::new(String::from("same")));
            assert_eq!(a, b);
            assert_ne!(a, c);
        }

        #[test]
        fn test_object_downcast() {
            let object = ObjectRef::new(Rc::new(42_u32));
            assert_eq!(object.downcast::<u32>().as_deref(), Some(&42));
            assert!(object.downcast::<String>().is_none());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::from("raw").to_string(), "raw");
        let map = Value::encode(&Point { x: 1, y: 2 }).unwrap();
        assert_eq!(map.to_string(), "{x: 1, y: 2}");
    }

    #[test]
    fn test_kind() {
        assert_eq!(Value::from(1.5).kind(), ValueKind::Float);
        assert_eq!(Value::from(vec!["a"]).kind(), ValueKind::List);
        assert_eq!(ValueKind::Str.to_string(), "string");
    }
}
