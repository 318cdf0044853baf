//! `ecore-proxy inspect` - list classes and feature ids of a schema.

use std::path::Path;

use anyhow::{Context, Result};
use ecore_proxy::{ClassSchema, FeatureKind, Package};

pub fn execute(schema: &Path, class: Option<&str>) -> Result<()> {
    let package = Package::from_file(schema)
        .with_context(|| format!("failed to load schema {}", schema.display()))?;

    println!("Package:  {}", package.name());
    if !package.ns_uri().is_empty() {
        println!("NS URI:   {}", package.ns_uri());
    }
    println!("Classes:  {}", package.class_count());

    match class {
        Some(name) => print_class(&package, package.require_by_name(name)?),
        None => {
            for class in package.classes() {
                print_class(&package, class);
            }
        }
    }
    Ok(())
}

fn print_class(package: &Package, class: &ClassSchema) {
    println!();
    let mut header = format!("{} (#{})", class.name(), class.id());
    if let Some(parent) = class.super_type().and_then(|id| package.class(id)) {
        header.push_str(&format!(" extends {}", parent.name()));
    }
    if class.is_abstract() {
        header.push_str(" [abstract]");
    }
    println!("{}", header);

    for feature in class.features() {
        let kind = match feature.kind() {
            FeatureKind::Attribute(kind) => kind.to_string(),
            FeatureKind::Reference { target, many: true } => format!("-> {}[*]", target),
            FeatureKind::Reference { target, many: false } => format!("-> {}", target),
        };
        println!("  {:>3}  {:<20} {}", feature.id().0, feature.name(), kind);
    }
}
