//! Schema introspection for path-reference expansion.
//!
//! The expander never looks at Rust types directly. Each config struct declares
//! a static table of field shapes through the [`Schema`] trait, normally with
//! the [`config_schema!`](crate::config_schema) macro, and the expander asks
//! [`field_shape`] what kind of value a field expects.

use std::any::TypeId;
use std::fmt;
use std::path::Path;

use super::ConfigError;

/// Declares the expected shape of each field of a config struct.
///
/// ```
/// use nested_config::{config_schema, FieldShape};
///
/// struct Dimensions;
/// struct House;
///
/// config_schema!(Dimensions {
///     "length" => FieldShape::Scalar,
///     "width" => FieldShape::Scalar,
/// });
///
/// config_schema!(House {
///     "name" => FieldShape::Scalar,
///     "dimensions" => FieldShape::nested::<Dimensions>(),
/// });
/// ```
pub trait Schema {
    /// Name used in error messages.
    fn type_name() -> &'static str;

    /// Returns the shape of `field`, or `None` if the struct does not declare it.
    fn field(name: &str) -> Option<FieldShape>;
}

/// A copyable runtime handle to a type's [`Schema`].
///
/// Lookups go through function pointers, so a schema may refer to itself
/// (directly or through other schemas) without infinite construction.
#[derive(Clone, Copy)]
pub struct StructType {
    id: TypeId,
    name: &'static str,
    lookup: fn(&str) -> Option<FieldShape>,
}

impl StructType {
    /// The handle for `S`. Two handles are equal when they name the same type.
    pub fn of<S: Schema + ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: S::type_name(),
            lookup: S::field,
        }
    }

    /// The name from [`Schema::type_name`].
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn lookup(&self, field: &str) -> Option<FieldShape> {
        (self.lookup)(field)
    }
}

impl fmt::Debug for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StructType").field(&self.name).finish()
    }
}

impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StructType {}

/// The kind of value a schema field expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    /// Anything that is not a nested structure: numbers, strings, plain lists.
    Scalar,
    Nested(StructType),
    OptionalNested(StructType),
    ListOf(Box<FieldShape>),
    /// A map with string keys.
    MapOf(Box<FieldShape>),
}

impl FieldShape {
    /// A required nested structure of type `S`.
    pub fn nested<S: Schema + ?Sized + 'static>() -> Self {
        FieldShape::Nested(StructType::of::<S>())
    }

    /// A nested structure that may be absent. Expanded the same way as
    /// [`FieldShape::nested`].
    pub fn optional<S: Schema + ?Sized + 'static>() -> Self {
        FieldShape::OptionalNested(StructType::of::<S>())
    }

    /// A list whose elements have shape `element`.
    pub fn list_of(element: FieldShape) -> Self {
        FieldShape::ListOf(Box::new(element))
    }

    /// A string-keyed map whose values have shape `value`.
    pub fn map_of(value: FieldShape) -> Self {
        FieldShape::MapOf(Box::new(value))
    }

    /// Returns the nested struct type when this shape is a (possibly optional) structure.
    pub fn as_struct(&self) -> Option<StructType> {
        match self {
            FieldShape::Nested(ty) | FieldShape::OptionalNested(ty) => Some(*ty),
            _ => None,
        }
    }
}

/// Looks up the shape of `field` on `ty`, normalized for expansion.
///
/// One level of optional and one level of list/map are interpreted. Anything
/// nested deeper than a list or map of structures is a plain collection and
/// reported as [`FieldShape::Scalar`]. `path` is the config file being
/// expanded and only appears in the error.
pub fn field_shape(ty: StructType, field: &str, path: &Path) -> Result<FieldShape, ConfigError> {
    let shape = ty.lookup(field).ok_or_else(|| ConfigError::UnknownField {
        path: path.to_path_buf(),
        type_name: ty.name(),
        field: field.to_string(),
    })?;
    Ok(normalize(shape))
}

fn normalize(shape: FieldShape) -> FieldShape {
    match shape {
        FieldShape::OptionalNested(ty) => FieldShape::Nested(ty),
        FieldShape::ListOf(inner) => match collection_element(*inner) {
            Some(element) => FieldShape::ListOf(Box::new(element)),
            None => FieldShape::Scalar,
        },
        FieldShape::MapOf(inner) => match collection_element(*inner) {
            Some(element) => FieldShape::MapOf(Box::new(element)),
            None => FieldShape::Scalar,
        },
        other => other,
    }
}

fn collection_element(shape: FieldShape) -> Option<FieldShape> {
    if let Some(ty) = shape.as_struct() {
        return Some(FieldShape::Nested(ty));
    }
    match shape {
        FieldShape::Scalar => Some(FieldShape::Scalar),
        _ => None,
    }
}

/// Implements [`Schema`] for a type from a table of field names and shapes.
///
/// Field names are the keys as they appear in config files, so serde renames
/// must be spelled the renamed way here.
#[macro_export]
macro_rules! config_schema {
    ($ty:ident { $($field:literal => $shape:expr),* $(,)? }) => {
        impl $crate::Schema for $ty {
            fn type_name() -> &'static str {
                ::core::stringify!($ty)
            }

            fn field(name: &str) -> ::core::option::Option<$crate::FieldShape> {
                match name {
                    $($field => ::core::option::Option::Some($shape),)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    };
}
