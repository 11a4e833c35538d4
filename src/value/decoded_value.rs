//! The generic value tree produced by the object-graph decoder.

use std::sync::Arc;

/// Ordered property list of a decoded object.
pub type ObjectProperties = Vec<(String, DecodedValue)>;

static UNDEFINED: DecodedValue = DecodedValue::Undefined;

/// A decoded structured-clone value.
///
/// Containers are shared through `Arc` between the tree and the object table of
/// their [`DecodedGraph`], so a [`Reference`](DecodedValue::Reference) resolves
/// to the very same allocation as the container it names.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Null,
    Undefined,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    /// Milliseconds since the Unix epoch.
    Date(f64),
    Array(Arc<Vec<DecodedValue>>),
    Object(Arc<ObjectProperties>),
    /// Index into the object table of the enclosing graph.
    Reference(u32),
}

impl DecodedValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            DecodedValue::Null => "null",
            DecodedValue::Undefined => "undefined",
            DecodedValue::Bool(_) => "bool",
            DecodedValue::Int(_) => "int",
            DecodedValue::Double(_) => "double",
            DecodedValue::Str(_) => "string",
            DecodedValue::Date(_) => "date",
            DecodedValue::Array(_) => "array",
            DecodedValue::Object(_) => "object",
            DecodedValue::Reference(_) => "reference",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, DecodedValue::Null | DecodedValue::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of ints, doubles and dates.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DecodedValue::Int(i) => Some(*i as f64),
            DecodedValue::Double(d) | DecodedValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Integer view; doubles and dates are truncated if finite.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DecodedValue::Int(i) => Some(*i),
            DecodedValue::Double(d) | DecodedValue::Date(d) if d.is_finite() => Some(*d as i64),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DecodedValue]> {
        match self {
            DecodedValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, DecodedValue)]> {
        match self {
            DecodedValue::Object(props) => Some(props),
            _ => None,
        }
    }

    /// Look up an object property without resolving references.
    pub fn get(&self, key: &str) -> Option<&DecodedValue> {
        self.as_object()?
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

// =============================================================================
// DecodedGraph
// =============================================================================

/// A decoded value together with the object table its references index into.
#[derive(Debug, Clone)]
pub struct DecodedGraph {
    root: DecodedValue,
    objects: Vec<DecodedValue>,
}

impl DecodedGraph {
    pub fn new(root: DecodedValue, objects: Vec<DecodedValue>) -> Self {
        Self { root, objects }
    }

    pub fn root(&self) -> &DecodedValue {
        &self.root
    }

    /// The object-table entry with the given id.
    pub fn object(&self, id: u32) -> Option<&DecodedValue> {
        self.objects.get(id as usize)
    }

    /// Number of id-bearing values read.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Follow a reference to its target; other values are returned unchanged.
    pub fn resolve<'a>(&'a self, value: &'a DecodedValue) -> &'a DecodedValue {
        match value {
            DecodedValue::Reference(id) => self.object(*id).unwrap_or(&UNDEFINED),
            other => other,
        }
    }

    /// Look up `key` on `value`, resolving references on both sides.
    pub fn field<'a>(&'a self, value: &'a DecodedValue, key: &str) -> Option<&'a DecodedValue> {
        self.resolve(value).get(key).map(|v| self.resolve(v))
    }

    /// Follow a path of property names from `value`.
    pub fn path<'a>(&'a self, value: &'a DecodedValue, keys: &[&str]) -> Option<&'a DecodedValue> {
        keys.iter()
            .try_fold(self.resolve(value), |current, key| self.field(current, key))
    }
}
