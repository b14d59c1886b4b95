//! Path-reference expansion.
//!
//! A config file may name another config file wherever its schema expects a
//! nested structure:
//!
//! ```toml
//! name = "Mom's house"
//! dimensions = "dims.toml"
//! ```
//!
//! The expander loads `dims.toml`, expands it against the nested schema, and
//! splices the result in place of the string. Lists and string-keyed maps of
//! nested structures are expanded element by element. Relative references are
//! resolved against the directory of the file that contains them.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, trace};

use super::schema::{field_shape, FieldShape, StructType};
use super::{ConfigError, ConfigPath, LoaderRegistry, RawTree};

/// Expands path references in config files using a [`LoaderRegistry`].
#[derive(Debug, Clone)]
pub struct Expander<'r> {
    registry: &'r LoaderRegistry,
    default_suffix: Option<String>,
}

impl<'r> Expander<'r> {
    /// Creates an expander that loads every file through `registry`.
    pub fn new(registry: &'r LoaderRegistry) -> Self {
        Self {
            registry,
            default_suffix: None,
        }
    }

    /// Sets the extension whose loader is used when a file's own extension
    /// has no loader, or the file has no extension.
    pub fn with_default_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.default_suffix = Some(suffix.into());
        self
    }

    /// Loads the file at `path` and expands every path reference in it, recursively.
    ///
    /// Fails on the first error anywhere in the chain of referenced files.
    /// A file that references itself, directly or through other files, is
    /// reported as [`ConfigError::CyclicReference`].
    pub fn expand(&self, path: &ConfigPath, ty: StructType) -> Result<RawTree, ConfigError> {
        let mut stack = Vec::new();
        self.expand_file(path.resolve()?, ty, &mut stack)
    }

    fn expand_file(
        &self,
        path: PathBuf,
        ty: StructType,
        stack: &mut Vec<PathBuf>,
    ) -> Result<RawTree, ConfigError> {
        let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if stack.contains(&key) {
            let mut chain = stack.clone();
            chain.push(key);
            return Err(ConfigError::CyclicReference { path, chain });
        }

        let raw = self
            .registry
            .load(&path, self.default_suffix.as_deref())?;

        stack.push(key);
        let expanded = self.expand_table(raw, ty, &path, "", stack);
        stack.pop();
        expanded
    }

    fn expand_table(
        &self,
        table: RawTree,
        ty: StructType,
        file: &Path,
        prefix: &str,
        stack: &mut Vec<PathBuf>,
    ) -> Result<RawTree, ConfigError> {
        table
            .into_iter()
            .map(|(field, value)| -> Result<(String, Value), ConfigError> {
                let shape = field_shape(ty, &field, file)?;
                let location = if prefix.is_empty() {
                    field.clone()
                } else {
                    format!("{prefix}.{field}")
                };
                let value = self.expand_value(value, &shape, file, &location, stack)?;
                Ok((field, value))
            })
            .collect()
    }

    fn expand_value(
        &self,
        value: Value,
        shape: &FieldShape,
        file: &Path,
        location: &str,
        stack: &mut Vec<PathBuf>,
    ) -> Result<Value, ConfigError> {
        match (value, shape) {
            (Value::Object(map), FieldShape::Nested(ty) | FieldShape::OptionalNested(ty)) => {
                trace!(field = location, schema = ty.name(), "expanding inline table");
                self.expand_table(map, *ty, file, location, stack)
                    .map(Value::Object)
            }
            (Value::String(reference), FieldShape::Nested(ty) | FieldShape::OptionalNested(ty)) => {
                self.expand_reference(&reference, *ty, file, location, stack)
                    .map(Value::Object)
            }
            (Value::Array(items), FieldShape::ListOf(element)) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    self.expand_value(item, element, file, &format!("{location}[{i}]"), stack)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (Value::Object(map), FieldShape::MapOf(element)) => map
                .into_iter()
                .map(|(key, item)| -> Result<(String, Value), ConfigError> {
                    let location = format!("{location}.{key}");
                    let item = self.expand_value(item, element, file, &location, stack)?;
                    Ok((key, item))
                })
                .collect::<Result<RawTree, ConfigError>>()
                .map(Value::Object),
            (value, _) => Ok(value),
        }
    }

    fn expand_reference(
        &self,
        reference: &str,
        ty: StructType,
        referrer: &Path,
        location: &str,
        stack: &mut Vec<PathBuf>,
    ) -> Result<RawTree, ConfigError> {
        let target = ConfigPath::referenced_from(reference, referrer).resolve()?;
        if !target.is_file() {
            return Err(ConfigError::MissingFile {
                referrer: referrer.to_path_buf(),
                field: location.to_string(),
                reference: reference.to_string(),
            });
        }

        debug!(
            referrer = %referrer.display(),
            field = location,
            target = %target.display(),
            schema = ty.name(),
            "following config reference"
        );
        self.expand_file(target, ty, stack)
            .map_err(|e| ConfigError::Reference {
                referrer: referrer.to_path_buf(),
                field: location.to_string(),
                source: Box::new(e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_schema;
    use serde_json::json;
    use tempfile::TempDir;

    struct Dimensions;
    struct House;
    struct HouseMaybeDim;
    struct HouseListDim;
    struct HouseDictDim;
    struct Room;
    struct Extra;
    struct Node;

    config_schema!(Dimensions {
        "length" => FieldShape::Scalar,
        "width" => FieldShape::Scalar,
        "height" => FieldShape::Scalar,
        "extra" => FieldShape::optional::<Extra>(),
    });

    config_schema!(Extra {
        "note" => FieldShape::Scalar,
    });

    config_schema!(House {
        "name" => FieldShape::Scalar,
        "dimensions" => FieldShape::nested::<Dimensions>(),
        "tags" => FieldShape::list_of(FieldShape::Scalar),
    });

    config_schema!(HouseMaybeDim {
        "name" => FieldShape::Scalar,
        "dimensions" => FieldShape::optional::<Dimensions>(),
    });

    config_schema!(HouseListDim {
        "name" => FieldShape::Scalar,
        "dimensions" => FieldShape::list_of(FieldShape::nested::<Dimensions>()),
    });

    config_schema!(HouseDictDim {
        "name" => FieldShape::Scalar,
        "dimensions" => FieldShape::map_of(FieldShape::nested::<Dimensions>()),
    });

    config_schema!(Room {
        "name" => FieldShape::Scalar,
        "dimensions" => FieldShape::nested::<Dimensions>(),
    });

    config_schema!(Node {
        "name" => FieldShape::Scalar,
        "next" => FieldShape::optional::<Node>(),
    });

    const DIMS: &str = "length = 40\nwidth = 20\nheight = 10\n";
    const GARAGE_DIMS: &str = "length = 15\nwidth = 15\nheight = 8\n";

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn expand<S: crate::Schema + 'static>(path: &Path) -> Result<RawTree, ConfigError> {
        let registry = LoaderRegistry::default();
        Expander::new(&registry).expand(&ConfigPath::new(path), StructType::of::<S>())
    }

    fn keys(tree: &RawTree) -> Vec<&str> {
        tree.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_inline_data_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "house.toml",
            r#"
            name = "home"
            tags = ["a.toml", "b.toml"]

            [dimensions]
            length = 40
            width = 20
            height = 10
            "#,
        );

        let loaded = LoaderRegistry::default().load(&path, None).unwrap();
        let expanded = expand::<House>(&path).unwrap();
        assert_eq!(expanded, loaded);
        assert_eq!(keys(&expanded), ["name", "tags", "dimensions"]);
    }

    #[test]
    fn test_string_reference_is_expanded() {
        let dir = TempDir::new().unwrap();
        write(&dir, "dims.toml", DIMS);
        let path = write(
            &dir,
            "house.toml",
            "dimensions = \"dims.toml\"\nname = \"Mom's house\"\n",
        );

        let tree = expand::<House>(&path).unwrap();
        assert_eq!(
            Value::Object(tree.clone()),
            json!({
                "dimensions": {"length": 40, "width": 20, "height": 10},
                "name": "Mom's house",
            })
        );
        assert_eq!(keys(&tree), ["dimensions", "name"]);
    }

    #[test]
    fn test_references_resolve_against_referencing_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "shared/extra.toml", "note = \"attic\"");
        // Same name next to the root file; must not be picked up.
        write(&dir, "extra.toml", "note = \"wrong\"");
        write(
            &dir,
            "sub/dims.toml",
            "length = 40\nwidth = 20\nheight = 10\nextra = \"../shared/extra.toml\"\n",
        );
        let path = write(&dir, "root.toml", "name = \"home\"\ndimensions = \"sub/dims.toml\"\n");

        let tree = expand::<House>(&path).unwrap();
        assert_eq!(tree["dimensions"]["extra"], json!({"note": "attic"}));
    }

    #[test]
    fn test_absolute_reference() {
        let dir = TempDir::new().unwrap();
        let dims = write(&dir, "elsewhere/dims.toml", DIMS);
        let path = write(
            &dir,
            "house.json",
            &json!({"name": "home", "dimensions": dims.to_str().unwrap()}).to_string(),
        );

        let tree = expand::<House>(&path).unwrap();
        assert_eq!(tree["dimensions"]["length"], json!(40));
    }

    #[test]
    fn test_missing_reference() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "house.toml", "name = \"home\"\ndimensions = \"nope.toml\"\n");

        match expand::<House>(&path) {
            Err(ConfigError::MissingFile {
                referrer,
                field,
                reference,
            }) => {
                assert_eq!(referrer, path);
                assert_eq!(field, "dimensions");
                assert_eq!(reference, "nope.toml");
            }
            other => panic!("expected MissingFile, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_reference_in_nested_file() {
        let dir = TempDir::new().unwrap();
        let dims = write(&dir, "sub/dims.toml", "length = 1\nextra = \"gone.toml\"\n");
        let path = write(&dir, "house.toml", "dimensions = \"sub/dims.toml\"\n");

        let err = expand::<House>(&path).unwrap_err();
        let ConfigError::Reference { referrer, field, .. } = &err else {
            panic!("expected a reference chain, got {err:?}");
        };
        assert_eq!(referrer, &path);
        assert_eq!(field, "dimensions");
        match err.root_cause() {
            ConfigError::MissingFile {
                referrer,
                reference,
                ..
            } => {
                assert_eq!(referrer, &dims);
                assert_eq!(reference, "gone.toml");
            }
            other => panic!("expected MissingFile, got {other:?}"),
        }
    }

    #[test]
    fn test_list_of_references_keeps_order() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.toml", DIMS);
        write(&dir, "b.toml", GARAGE_DIMS);
        let path = write(
            &dir,
            "house.toml",
            "name = \"home\"\ndimensions = [\"b.toml\", \"a.toml\"]\n",
        );

        let tree = expand::<HouseListDim>(&path).unwrap();
        assert_eq!(
            tree["dimensions"],
            json!([
                {"length": 15, "width": 15, "height": 8},
                {"length": 40, "width": 20, "height": 10},
            ])
        );
    }

    #[test]
    fn test_list_mixing_inline_tables_and_references() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.toml", DIMS);
        let path = write(
            &dir,
            "house.json",
            r#"{"name": "home", "dimensions": [{"length": 1, "width": 2, "height": 3}, "a.toml"]}"#,
        );

        let tree = expand::<HouseListDim>(&path).unwrap();
        assert_eq!(tree["dimensions"][0], json!({"length": 1, "width": 2, "height": 3}));
        assert_eq!(tree["dimensions"][1]["length"], json!(40));
    }

    #[test]
    fn test_map_of_references_keeps_keys() {
        let dir = TempDir::new().unwrap();
        write(&dir, "house_dims.toml", DIMS);
        write(&dir, "garage_dims.toml", GARAGE_DIMS);
        let path = write(
            &dir,
            "house.toml",
            r#"
            name = "home"

            [dimensions]
            house = "house_dims.toml"
            garage = "garage_dims.toml"
            "#,
        );

        let tree = expand::<HouseDictDim>(&path).unwrap();
        let dimensions = tree["dimensions"].as_object().unwrap();
        assert_eq!(keys(dimensions), ["house", "garage"]);
        assert_eq!(dimensions["house"]["length"], json!(40));
        assert_eq!(dimensions["garage"]["length"], json!(15));
    }

    #[test]
    fn test_optional_nested_absent_or_present() {
        let dir = TempDir::new().unwrap();
        write(&dir, "dims.toml", DIMS);
        let present = write(&dir, "present.toml", "name = \"a\"\ndimensions = \"dims.toml\"\n");
        let absent = write(&dir, "absent.toml", "name = \"b\"\n");
        let null = write(&dir, "null.json", r#"{"name": "c", "dimensions": null}"#);

        let tree = expand::<HouseMaybeDim>(&present).unwrap();
        assert_eq!(tree["dimensions"]["height"], json!(10));

        let tree = expand::<HouseMaybeDim>(&absent).unwrap();
        assert!(!tree.contains_key("dimensions"));

        let tree = expand::<HouseMaybeDim>(&null).unwrap();
        assert_eq!(tree["dimensions"], Value::Null);
    }

    #[test]
    fn test_reference_inside_inline_table() {
        let dir = TempDir::new().unwrap();
        write(&dir, "extra.toml", "note = \"porch\"");
        let path = write(
            &dir,
            "room.toml",
            r#"
            name = "den"

            [dimensions]
            length = 4
            width = 3
            height = 2
            extra = "extra.toml"
            "#,
        );

        let tree = expand::<Room>(&path).unwrap();
        assert_eq!(tree["dimensions"]["extra"], json!({"note": "porch"}));
        assert_eq!(
            keys(tree["dimensions"].as_object().unwrap()),
            ["length", "width", "height", "extra"]
        );
    }

    #[test]
    fn test_unknown_field() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "house.toml", "name = \"home\"\nbasement = true\n");

        match expand::<House>(&path) {
            Err(ConfigError::UnknownField {
                path: file,
                type_name,
                field,
            }) => {
                assert_eq!(file, path);
                assert_eq!(type_name, "House");
                assert_eq!(field, "basement");
            }
            other => panic!("expected UnknownField, got {other:?}"),
        }
    }

    #[test]
    fn test_self_reference_is_cyclic() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "loop.toml", "name = \"a\"\nnext = \"loop.toml\"\n");

        let err = expand::<Node>(&path).unwrap_err();
        assert!(matches!(err.root_cause(), ConfigError::CyclicReference { .. }));
    }

    #[test]
    fn test_two_file_cycle() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.toml", "name = \"b\"\nnext = \"./a.toml\"\n");
        let path = write(&dir, "a.toml", "name = \"a\"\nnext = \"b.toml\"\n");

        let err = expand::<Node>(&path).unwrap_err();
        match err.root_cause() {
            ConfigError::CyclicReference { chain, .. } => assert_eq!(chain.len(), 3),
            other => panic!("expected CyclicReference, got {other:?}"),
        }
    }

    #[test]
    fn test_chain_without_cycle() {
        let dir = TempDir::new().unwrap();
        write(&dir, "c.toml", "name = \"c\"\n");
        write(&dir, "b.toml", "name = \"b\"\nnext = \"c.toml\"\n");
        let path = write(&dir, "a.toml", "name = \"a\"\nnext = \"b.toml\"\n");

        let tree = expand::<Node>(&path).unwrap();
        assert_eq!(
            Value::Object(tree),
            json!({"name": "a", "next": {"name": "b", "next": {"name": "c"}}})
        );
    }

    #[test]
    fn test_same_file_referenced_twice_is_not_a_cycle() {
        let dir = TempDir::new().unwrap();
        write(&dir, "dims.toml", DIMS);
        let path = write(
            &dir,
            "house.toml",
            "name = \"twins\"\ndimensions = [\"dims.toml\", \"dims.toml\"]\n",
        );

        let tree = expand::<HouseListDim>(&path).unwrap();
        assert_eq!(tree["dimensions"][0], tree["dimensions"][1]);
    }

    #[test]
    fn test_loader_error_in_referenced_file() {
        let dir = TempDir::new().unwrap();
        let broken = write(&dir, "dims.toml", "length = ");
        let path = write(&dir, "house.toml", "dimensions = \"dims.toml\"\n");

        let err = expand::<House>(&path).unwrap_err();
        match err.root_cause() {
            ConfigError::Load { path, .. } => assert_eq!(path, &broken),
            other => panic!("expected Load error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_suffix_applies_to_references() {
        let dir = TempDir::new().unwrap();
        write(&dir, "dims.conf", DIMS);
        let path = write(&dir, "house.conf", "name = \"home\"\ndimensions = \"dims.conf\"\n");

        let registry = LoaderRegistry::default();
        let tree = Expander::new(&registry)
            .with_default_suffix("toml")
            .expand(&ConfigPath::new(&path), StructType::of::<House>())
            .unwrap();
        assert_eq!(tree["dimensions"]["width"], json!(20));
    }
}
