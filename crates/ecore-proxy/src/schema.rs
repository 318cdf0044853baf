//! Class schemas: runtime type descriptors and feature-id tables
//!
//! A [`Package`] is the registry of every class the native side can
//! instantiate. Each [`ClassSchema`] carries a flattened feature table
//! (inherited features first, ids dense from zero), which is what lets a
//! reflective proxy validate a feature id before crossing the boundary.

use std::fmt;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::{BridgeError, BridgeResult};
use crate::value::{AnyValue, ValueKind};

// ============================================================================
// Identifiers
// ============================================================================

/// Index of a class within its package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

/// Index of a feature within a class's flattened feature table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Features
// ============================================================================

/// What a feature holds
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureKind {
    /// Plain data attribute
    Attribute(ValueKind),
    /// Reference to objects of another class
    Reference {
        /// Target class name
        target: String,
        /// Many-valued (backed by a native sequence)
        many: bool,
    },
}

impl FeatureKind {
    /// Kind of value `e_get` returns for this feature
    pub fn value_kind(&self) -> ValueKind {
        match self {
            FeatureKind::Attribute(kind) => *kind,
            FeatureKind::Reference { many: true, .. } => ValueKind::List,
            FeatureKind::Reference { many: false, .. } => ValueKind::Object,
        }
    }

    /// True for many-valued references
    pub fn is_many(&self) -> bool {
        matches!(self, FeatureKind::Reference { many: true, .. })
    }
}

/// One attribute or reference of a class
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    id: FeatureId,
    name: String,
    kind: FeatureKind,
    default: AnyValue,
}

impl FeatureSchema {
    /// Feature id within the owning class
    pub fn id(&self) -> FeatureId {
        self.id
    }

    /// Feature name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Feature kind
    pub fn kind(&self) -> &FeatureKind {
        &self.kind
    }

    /// Kind of value stored in this feature
    pub fn value_kind(&self) -> ValueKind {
        self.kind.value_kind()
    }

    /// Value reported while the feature is unset
    pub fn default_value(&self) -> &AnyValue {
        &self.default
    }
}

// ============================================================================
// ClassSchema
// ============================================================================

#[derive(Debug, Clone)]
struct FeatureDef {
    name: String,
    kind: FeatureKind,
    default: Option<AnyValue>,
}

/// Unresolved class definition produced by [`ClassSchemaBuilder`].
///
/// Only its own features are listed; inherited ones are added when the
/// package is built.
#[derive(Debug, Clone)]
pub struct ClassDef {
    name: String,
    super_type: Option<String>,
    is_abstract: bool,
    features: Vec<FeatureDef>,
}

/// Builder for class definitions.
pub struct ClassSchemaBuilder {
    def: ClassDef,
}

impl ClassSchemaBuilder {
    /// Inherit all features of `super_type`
    pub fn extends(mut self, super_type: &str) -> Self {
        self.def.super_type = Some(super_type.to_string());
        self
    }

    /// Mark the class as abstract (not instantiable)
    pub fn abstract_class(mut self) -> Self {
        self.def.is_abstract = true;
        self
    }

    /// Add a data attribute
    pub fn attribute(mut self, name: &str, kind: ValueKind) -> Self {
        self.def.features.push(FeatureDef {
            name: name.to_string(),
            kind: FeatureKind::Attribute(kind),
            default: None,
        });
        self
    }

    /// Add a data attribute with an explicit default value
    pub fn attribute_with_default(mut self, name: &str, kind: ValueKind, default: AnyValue) -> Self {
        self.def.features.push(FeatureDef {
            name: name.to_string(),
            kind: FeatureKind::Attribute(kind),
            default: Some(default),
        });
        self
    }

    /// Add a single-valued reference
    pub fn reference(mut self, name: &str, target: &str) -> Self {
        self.def.features.push(FeatureDef {
            name: name.to_string(),
            kind: FeatureKind::Reference {
                target: target.to_string(),
                many: false,
            },
            default: None,
        });
        self
    }

    /// Add a many-valued reference.
    ///
    /// The backing sequence references its elements; it never owns them.
    pub fn many_reference(mut self, name: &str, target: &str) -> Self {
        self.def.features.push(FeatureDef {
            name: name.to_string(),
            kind: FeatureKind::Reference {
                target: target.to_string(),
                many: true,
            },
            default: None,
        });
        self
    }

    /// Finish the definition
    pub fn build(self) -> ClassDef {
        self.def
    }
}

/// Runtime type descriptor of one class.
#[derive(Debug, Clone)]
pub struct ClassSchema {
    id: ClassId,
    name: String,
    super_type: Option<ClassId>,
    ancestors: Vec<ClassId>,
    is_abstract: bool,
    features: Vec<FeatureSchema>,
    feature_lookup: FxHashMap<String, FeatureId>,
}

impl ClassSchema {
    /// Create a builder for a class definition
    pub fn builder(name: &str) -> ClassSchemaBuilder {
        ClassSchemaBuilder {
            def: ClassDef {
                name: name.to_string(),
                super_type: None,
                is_abstract: false,
                features: Vec::new(),
            },
        }
    }

    /// Class id within its package
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct super type, if any
    pub fn super_type(&self) -> Option<ClassId> {
        self.super_type
    }

    /// Whether the class can be instantiated
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Number of features, inherited ones included
    pub fn feature_count(&self) -> u32 {
        self.features.len() as u32
    }

    /// All features in id order
    pub fn features(&self) -> &[FeatureSchema] {
        &self.features
    }

    /// Look up a feature by id; ids outside the table are an error
    pub fn feature(&self, id: FeatureId) -> BridgeResult<&FeatureSchema> {
        self.features
            .get(id.0 as usize)
            .ok_or_else(|| BridgeError::FeatureOutOfRange {
                class: self.name.clone(),
                feature: id.0,
                count: self.feature_count(),
            })
    }

    /// Look up a feature id by name
    pub fn feature_id(&self, name: &str) -> BridgeResult<FeatureId> {
        self.feature_lookup
            .get(name)
            .copied()
            .ok_or_else(|| BridgeError::UnknownFeature {
                class: self.name.clone(),
                feature: name.to_string(),
            })
    }

    /// True if `other` is this class or one of its ancestors
    pub fn is_subtype_of(&self, other: ClassId) -> bool {
        self.id == other || self.ancestors.contains(&other)
    }
}

// ============================================================================
// Package
// ============================================================================

/// Registry of class schemas sharing one namespace.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    ns_uri: String,
    classes: Vec<ClassSchema>,
    name_to_id: FxHashMap<String, ClassId>,
}

/// Builder collecting class definitions for a [`Package`].
pub struct PackageBuilder {
    name: String,
    ns_uri: String,
    defs: Vec<ClassDef>,
}

impl PackageBuilder {
    /// Add a class definition
    pub fn class(mut self, def: ClassDef) -> Self {
        self.defs.push(def);
        self
    }

    /// Validate every definition and resolve inheritance.
    ///
    /// Class ids follow definition order. Fails on duplicate class or
    /// feature names, unknown super types or reference targets,
    /// attributes typed as object or list, and inheritance cycles.
    pub fn build(self) -> BridgeResult<Package> {
        let mut name_to_id = FxHashMap::default();
        for (index, def) in self.defs.iter().enumerate() {
            if name_to_id
                .insert(def.name.clone(), ClassId(index as u32))
                .is_some()
            {
                return Err(BridgeError::Schema(format!(
                    "duplicate class '{}' in package '{}'",
                    def.name, self.name
                )));
            }
        }

        for def in &self.defs {
            if let Some(ref parent) = def.super_type {
                if !name_to_id.contains_key(parent) {
                    return Err(BridgeError::Schema(format!(
                        "class '{}' extends unknown class '{}'",
                        def.name, parent
                    )));
                }
            }
            for feature in &def.features {
                match feature.kind {
                    FeatureKind::Reference { ref target, .. } => {
                        if !name_to_id.contains_key(target) {
                            return Err(BridgeError::Schema(format!(
                                "feature '{}.{}' references unknown class '{}'",
                                def.name, feature.name, target
                            )));
                        }
                    }
                    // Handles are only stored through references
                    FeatureKind::Attribute(kind @ (ValueKind::Object | ValueKind::List)) => {
                        return Err(BridgeError::Schema(format!(
                            "attribute '{}.{}' has type {}; declare it as a reference",
                            def.name, feature.name, kind
                        )));
                    }
                    FeatureKind::Attribute(_) => {}
                }
                if let Some(ref default) = feature.default {
                    let kind = feature.kind.value_kind();
                    if !default.fits(kind) {
                        return Err(BridgeError::Schema(format!(
                            "default of '{}.{}' is {}, expected {}",
                            def.name,
                            feature.name,
                            default.type_name(),
                            kind
                        )));
                    }
                }
            }
        }

        let mut classes = Vec::with_capacity(self.defs.len());
        for (index, def) in self.defs.iter().enumerate() {
            let ancestors = ancestors_of(&self.defs, &name_to_id, index)?;

            // Inherited features first, root-most class first
            let mut chain: Vec<&ClassDef> = ancestors
                .iter()
                .rev()
                .map(|id| &self.defs[id.0 as usize])
                .collect();
            chain.push(def);

            let mut features = Vec::new();
            let mut feature_lookup = FxHashMap::default();
            for owner in chain {
                for feature in &owner.features {
                    let id = FeatureId(features.len() as u32);
                    if feature_lookup.insert(feature.name.clone(), id).is_some() {
                        return Err(BridgeError::Schema(format!(
                            "duplicate feature '{}' in class '{}'",
                            feature.name, def.name
                        )));
                    }
                    let default = feature
                        .default
                        .clone()
                        .unwrap_or_else(|| AnyValue::default_for(feature.kind.value_kind()));
                    features.push(FeatureSchema {
                        id,
                        name: feature.name.clone(),
                        kind: feature.kind.clone(),
                        default,
                    });
                }
            }

            classes.push(ClassSchema {
                id: ClassId(index as u32),
                name: def.name.clone(),
                super_type: ancestors.first().copied(),
                ancestors,
                is_abstract: def.is_abstract,
                features,
                feature_lookup,
            });
        }

        Ok(Package {
            name: self.name,
            ns_uri: self.ns_uri,
            classes,
            name_to_id,
        })
    }
}

/// Ancestor ids of `index`, nearest first
fn ancestors_of(
    defs: &[ClassDef],
    name_to_id: &FxHashMap<String, ClassId>,
    index: usize,
) -> BridgeResult<Vec<ClassId>> {
    let mut ancestors = Vec::new();
    let mut current = &defs[index];
    while let Some(ref parent) = current.super_type {
        let parent_id = name_to_id[parent];
        if parent_id.0 as usize == index || ancestors.contains(&parent_id) {
            return Err(BridgeError::Schema(format!(
                "inheritance cycle through class '{}'",
                defs[index].name
            )));
        }
        ancestors.push(parent_id);
        current = &defs[parent_id.0 as usize];
    }
    Ok(ancestors)
}

impl Package {
    /// Start building a package
    pub fn builder(name: &str, ns_uri: &str) -> PackageBuilder {
        PackageBuilder {
            name: name.to_string(),
            ns_uri: ns_uri.to_string(),
            defs: Vec::new(),
        }
    }

    /// Parse a package from a TOML schema document
    pub fn from_toml_str(content: &str) -> BridgeResult<Self> {
        let doc: PackageDoc =
            toml::from_str(content).map_err(|e| BridgeError::Schema(e.to_string()))?;
        doc.into_package()
    }

    /// Load a package from a TOML schema file
    pub fn from_file(path: &Path) -> BridgeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Package name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace URI
    pub fn ns_uri(&self) -> &str {
        &self.ns_uri
    }

    /// Get class by ID
    pub fn class(&self, id: ClassId) -> Option<&ClassSchema> {
        self.classes.get(id.0 as usize)
    }

    /// Get class by name
    pub fn class_by_name(&self, name: &str) -> Option<&ClassSchema> {
        self.name_to_id
            .get(name)
            .and_then(|id| self.classes.get(id.0 as usize))
    }

    /// Get class by ID, failing with `UnknownClass`
    pub fn require(&self, id: ClassId) -> BridgeResult<&ClassSchema> {
        self.class(id)
            .ok_or_else(|| BridgeError::UnknownClass(format!("#{}", id)))
    }

    /// Get class by name, failing with `UnknownClass`
    pub fn require_by_name(&self, name: &str) -> BridgeResult<&ClassSchema> {
        self.class_by_name(name)
            .ok_or_else(|| BridgeError::UnknownClass(name.to_string()))
    }

    /// True if `class` is `ancestor` or derives from it
    pub fn is_a(&self, class: ClassId, ancestor: ClassId) -> bool {
        self.class(class)
            .map(|c| c.is_subtype_of(ancestor))
            .unwrap_or(false)
    }

    /// All classes in id order
    pub fn classes(&self) -> &[ClassSchema] {
        &self.classes
    }

    /// Number of registered classes
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

// ============================================================================
// TOML schema documents
// ============================================================================

#[derive(Debug, Deserialize)]
struct PackageDoc {
    name: String,
    #[serde(default)]
    ns_uri: String,
    #[serde(default, rename = "class")]
    classes: Vec<ClassDoc>,
}

#[derive(Debug, Deserialize)]
struct ClassDoc {
    name: String,
    #[serde(default)]
    extends: Option<String>,
    #[serde(default, rename = "abstract")]
    is_abstract: bool,
    #[serde(default)]
    features: Vec<FeatureDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeatureDoc {
    name: String,
    #[serde(default, rename = "type")]
    kind: Option<ValueKind>,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    many: bool,
    #[serde(default)]
    default: Option<toml::Value>,
}

impl PackageDoc {
    fn into_package(self) -> BridgeResult<Package> {
        let mut builder = Package::builder(&self.name, &self.ns_uri);
        for class in self.classes {
            let mut def = ClassSchema::builder(&class.name);
            if let Some(ref parent) = class.extends {
                def = def.extends(parent);
            }
            if class.is_abstract {
                def = def.abstract_class();
            }
            for feature in class.features {
                if feature.many && feature.reference.is_none() {
                    return Err(BridgeError::Schema(format!(
                        "feature '{}.{}' sets `many` without a `reference`",
                        class.name, feature.name
                    )));
                }
                def = match (feature.kind, feature.reference) {
                    (Some(kind), None) => match feature.default {
                        Some(raw) => {
                            let value = toml_to_any(&raw, kind).ok_or_else(|| {
                                BridgeError::Schema(format!(
                                    "default of '{}.{}' is not a valid {}",
                                    class.name, feature.name, kind
                                ))
                            })?;
                            def.attribute_with_default(&feature.name, kind, value)
                        }
                        None => def.attribute(&feature.name, kind),
                    },
                    (None, Some(target)) if feature.many => def.many_reference(&feature.name, &target),
                    (None, Some(target)) => def.reference(&feature.name, &target),
                    _ => {
                        return Err(BridgeError::Schema(format!(
                            "feature '{}.{}' needs exactly one of `type` or `reference`",
                            class.name, feature.name
                        )))
                    }
                };
            }
            builder = builder.class(def.build());
        }
        builder.build()
    }
}

fn toml_to_any(raw: &toml::Value, kind: ValueKind) -> Option<AnyValue> {
    match (kind, raw) {
        (ValueKind::Bool, toml::Value::Boolean(b)) => Some(AnyValue::Bool(*b)),
        (ValueKind::Int, toml::Value::Integer(i)) => i32::try_from(*i).ok().map(AnyValue::Int),
        (ValueKind::Long, toml::Value::Integer(i)) => Some(AnyValue::Long(*i)),
        (ValueKind::Double, toml::Value::Float(f)) => Some(AnyValue::Double(*f)),
        (ValueKind::Double, toml::Value::Integer(i)) => Some(AnyValue::Double(*i as f64)),
        (ValueKind::String, toml::Value::String(s)) => Some(AnyValue::String(s.clone())),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Package {
        Package::builder("sample", "urn:sample")
            .class(
                ClassSchema::builder("Named")
                    .abstract_class()
                    .attribute("name", ValueKind::String)
                    .build(),
            )
            .class(
                ClassSchema::builder("Machine")
                    .extends("Named")
                    .attribute("cores", ValueKind::Int)
                    .attribute_with_default("online", ValueKind::Bool, AnyValue::Bool(true))
                    .build(),
            )
            .class(
                ClassSchema::builder("Cluster")
                    .extends("Named")
                    .many_reference("machines", "Machine")
                    .reference("head", "Machine")
                    .build(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_inherited_features_come_first() {
        let package = sample();
        let machine = package.class_by_name("Machine").unwrap();
        assert_eq!(machine.feature_count(), 3);
        assert_eq!(machine.feature_id("name").unwrap(), FeatureId(0));
        assert_eq!(machine.feature_id("cores").unwrap(), FeatureId(1));
        assert_eq!(machine.feature_id("online").unwrap(), FeatureId(2));
        assert_eq!(
            machine.feature(FeatureId(2)).unwrap().default_value(),
            &AnyValue::Bool(true)
        );
    }

    #[test]
    fn test_feature_out_of_range() {
        let package = sample();
        let machine = package.class_by_name("Machine").unwrap();
        let err = machine.feature(FeatureId(3)).unwrap_err();
        assert_eq!(
            err,
            BridgeError::FeatureOutOfRange {
                class: "Machine".into(),
                feature: 3,
                count: 3
            }
        );
    }

    #[test]
    fn test_subtyping() {
        let package = sample();
        let named = package.class_by_name("Named").unwrap().id();
        let machine = package.class_by_name("Machine").unwrap().id();
        let cluster = package.class_by_name("Cluster").unwrap().id();
        assert!(package.is_a(machine, named));
        assert!(package.is_a(machine, machine));
        assert!(!package.is_a(machine, cluster));
        assert!(!package.is_a(named, machine));
        assert_eq!(package.class(machine).unwrap().super_type(), Some(named));
    }

    #[test]
    fn test_reference_kinds() {
        let package = sample();
        let cluster = package.class_by_name("Cluster").unwrap();
        let machines = cluster.feature(cluster.feature_id("machines").unwrap()).unwrap();
        let head = cluster.feature(cluster.feature_id("head").unwrap()).unwrap();
        assert_eq!(machines.value_kind(), ValueKind::List);
        assert!(machines.kind().is_many());
        assert_eq!(head.value_kind(), ValueKind::Object);
        assert_eq!(head.default_value(), &AnyValue::Null);
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let result = Package::builder("dup", "")
            .class(ClassSchema::builder("A").build())
            .class(ClassSchema::builder("A").build())
            .build();
        assert!(matches!(result, Err(BridgeError::Schema(_))));
    }

    #[test]
    fn test_duplicate_inherited_feature_rejected() {
        let result = Package::builder("dup", "")
            .class(ClassSchema::builder("A").attribute("x", ValueKind::Int).build())
            .class(
                ClassSchema::builder("B")
                    .extends("A")
                    .attribute("x", ValueKind::Int)
                    .build(),
            )
            .build();
        assert!(matches!(result, Err(BridgeError::Schema(_))));
    }

    #[test]
    fn test_unknown_targets_rejected() {
        let result = Package::builder("bad", "")
            .class(ClassSchema::builder("A").reference("b", "Missing").build())
            .build();
        assert!(matches!(result, Err(BridgeError::Schema(_))));

        let result = Package::builder("bad", "")
            .class(ClassSchema::builder("A").extends("Missing").build())
            .build();
        assert!(matches!(result, Err(BridgeError::Schema(_))));
    }

    #[test]
    fn test_inheritance_cycle_rejected() {
        let result = Package::builder("cycle", "")
            .class(ClassSchema::builder("A").extends("B").build())
            .class(ClassSchema::builder("B").extends("A").build())
            .build();
        assert!(matches!(result, Err(BridgeError::Schema(_))));
    }

    #[test]
    fn test_bad_default_rejected() {
        let result = Package::builder("bad", "")
            .class(
                ClassSchema::builder("A")
                    .attribute_with_default("n", ValueKind::Int, AnyValue::Bool(true))
                    .build(),
            )
            .build();
        assert!(matches!(result, Err(BridgeError::Schema(_))));
    }

    #[test]
    fn test_from_toml() {
        let package = Package::from_toml_str(
            r#"
name = "jobs"
ns_uri = "urn:jobs"

[[class]]
name = "Job"
features = [
    { name = "id", type = "string" },
    { name = "priority", type = "int", default = 5 },
]

[[class]]
name = "JobList"
features = [
    { name = "jobs", reference = "Job", many = true },
]
"#,
        )
        .unwrap();

        assert_eq!(package.name(), "jobs");
        assert_eq!(package.ns_uri(), "urn:jobs");
        assert_eq!(package.class_count(), 2);
        let job = package.require_by_name("Job").unwrap();
        let priority = job.feature(FeatureId(1)).unwrap();
        assert_eq!(priority.name(), "priority");
        assert_eq!(priority.default_value(), &AnyValue::Int(5));
    }

    #[test]
    fn test_from_toml_rejects_ambiguous_feature() {
        let result = Package::from_toml_str(
            r#"
name = "bad"

[[class]]
name = "A"
features = [{ name = "x" }]
"#,
        );
        assert!(matches!(result, Err(BridgeError::Schema(_))));
    }

    #[test]
    fn test_handle_typed_attributes_rejected() {
        for kind in [ValueKind::Object, ValueKind::List] {
            let result = Package::builder("bad", "")
                .class(ClassSchema::builder("Holder").attribute("raw", kind).build())
                .build();
            assert!(matches!(result, Err(BridgeError::Schema(_))), "{:?}", kind);
        }

        let result = Package::from_toml_str(
            r#"
name = "bad"

[[class]]
name = "Holder"
features = [{ name = "raw", type = "list" }]
"#,
        );
        assert!(matches!(result, Err(BridgeError::Schema(_))));
    }

    #[test]
    fn test_from_toml_rejects_many_attribute() {
        let result = Package::from_toml_str(
            r#"
name = "bad"

[[class]]
name = "A"
features = [{ name = "tags", type = "string", many = true }]
"#,
        );
        match result {
            Err(BridgeError::Schema(message)) => assert!(message.contains("many")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_toml_rejects_unknown_feature_keys() {
        let result = Package::from_toml_str(
            r#"
name = "bad"

[[class]]
name = "Item"

[[class]]
name = "Bag"
features = [{ name = "items", reference = "Item", many = true, containment = true }]
"#,
        );
        assert!(matches!(result, Err(BridgeError::Schema(_))));
    }
}
