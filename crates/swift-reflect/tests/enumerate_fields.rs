// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end field enumeration over synthesized metadata images, through
//! the public API only.

use swift_reflect::image::{MetadataImage, Parent, SuperclassRef, TupleElementSpec};
use swift_reflect::{
    enumerate_fields, resolver_fn, FieldEnumerator, FieldInfo, MetadataRef, ReflectConfig,
    TypeTable,
};

struct World {
    image: MetadataImage,
    int: MetadataRef,
    string: MetadataRef,
    types: TypeTable,
}

fn world() -> World {
    let mut image = MetadataImage::new();
    let int = image.struct_type("Int").build().expect("Int").metadata;
    let string = image
        .struct_type("String")
        .field("_guts", b"s11_StringGutsV", 0)
        .build()
        .expect("String")
        .metadata;
    let types = TypeTable::new().with(&b"Si"[..], int).with(&b"SS"[..], string);
    World {
        image,
        int,
        string,
        types,
    }
}

fn field(name: &str, offset: usize, ty: Option<MetadataRef>) -> FieldInfo {
    FieldInfo {
        name: name.to_owned(),
        offset,
        ty,
    }
}

#[test]
fn three_level_hierarchy_with_module_context() {
    let mut w = world();
    let module = w.image.module("Zoo").expect("module");
    let animal = w
        .image
        .class_type("Animal")
        .parent(Parent::Direct(module))
        .field("name", b"SS", 16)
        .build()
        .expect("Animal");
    let mammal = w
        .image
        .class_type("Mammal")
        .parent(Parent::Direct(module))
        .superclass(&animal)
        .field("legs", b"Si", 32)
        .extra_members(2)
        .build()
        .expect("Mammal");
    let dog = w
        .image
        .class_type("Dog")
        .parent(Parent::Indirect(module))
        .superclass(&mammal)
        .field("good", b"Sb", 40)
        .build()
        .expect("Dog");

    let fields = FieldEnumerator::new(&w.types)
        .fields(dog.metadata)
        .expect("complete");
    assert_eq!(
        fields,
        [
            field("name", 16, Some(w.string)),
            field("legs", 32, Some(w.int)),
            field("good", 40, None),
        ]
    );
    let dog_descriptor = dog.descriptor.expect("descriptor");
    assert_eq!(dog_descriptor.context().module_name(), Some(&b"Zoo"[..]));
}

#[test]
fn resilient_hierarchy_needs_opt_in() {
    let mut w = world();
    let base = w
        .image
        .class_type("Base")
        .field("id", b"Si", 16)
        .build()
        .expect("Base");
    let derived = w
        .image
        .class_type("Derived")
        .superclass(&base)
        .resilient_superclass(SuperclassRef::Indirect(base.descriptor.expect("descriptor")))
        .field("label", b"SS", 24)
        .build()
        .expect("Derived");

    // SAFETY: metadata from a live image.
    let refused = unsafe { enumerate_fields(derived.metadata.as_ptr(), false, &w.types, |_, _, _| true) };
    assert!(!refused);

    let mut names = Vec::new();
    // SAFETY: as above.
    let complete = unsafe {
        enumerate_fields(derived.metadata.as_ptr(), true, &w.types, |name, _, _| {
            names.push(String::from_utf8_lossy(name).into_owned());
            true
        })
    };
    assert!(complete);
    assert_eq!(names, ["id", "label"]);

    // A second walk reads the published bounds.
    let again = FieldEnumerator::new(&w.types)
        .with_config(ReflectConfig::new().with_resilient_superclasses(true))
        .fields(derived.metadata)
        .expect("complete");
    assert_eq!(again[1], field("label", 24, Some(w.string)));
}

#[test]
fn tuple_of_struct_and_class() {
    let mut w = world();
    let class = w.image.class_type("Ref").build().expect("Ref");
    let tuple = w
        .image
        .tuple_type(&[
            TupleElementSpec::new(Some("count"), w.int, 0),
            TupleElementSpec::new(None, class.metadata, 8),
            TupleElementSpec::new(Some("text"), w.string, 16),
        ])
        .expect("tuple");
    let fields = FieldEnumerator::new(&w.types).fields(tuple).expect("complete");
    assert_eq!(
        fields,
        [
            field("count", 0, Some(w.int)),
            field("", 8, Some(class.metadata)),
            field("text", 16, Some(w.string)),
        ]
    );
}

#[test]
fn closure_resolver_sees_declaring_context() {
    let mut w = world();
    let point = w
        .image
        .struct_type("Point")
        .field("x", b"Si", 0)
        .field("y", b"Si", 8)
        .build()
        .expect("Point");

    let resolver = resolver_fn(|name, context, args| {
        assert_eq!(context.name(), b"Point");
        assert!(args.is_none());
        (name.as_bytes() == b"Si").then_some(w.int)
    });
    let mut offsets = Vec::new();
    let complete = FieldEnumerator::new(&resolver).enumerate(point.metadata, |_, offset, ty| {
        assert_eq!(ty, Some(w.int));
        offsets.push(offset);
        true
    });
    assert!(complete);
    assert_eq!(offsets, [0, 8]);
}

#[test]
fn nested_struct_fields_can_be_walked_recursively() {
    let mut w = world();
    let inner = w
        .image
        .struct_type("Inner")
        .field("v", b"Si", 0)
        .build()
        .expect("Inner");
    let outer = w
        .image
        .struct_type("Outer")
        .field("first", b"5Inner", 0)
        .field("second", b"5Inner", 8)
        .build()
        .expect("Outer");
    let types = TypeTable::new()
        .with(&b"Si"[..], w.int)
        .with(&b"5Inner"[..], inner.metadata);
    let enumerator = FieldEnumerator::new(&types);

    fn flatten(
        enumerator: &FieldEnumerator<'_, TypeTable>,
        metadata: MetadataRef,
        base: usize,
        out: &mut Vec<usize>,
    ) {
        let fields = enumerator.fields(metadata).expect("complete");
        if fields.is_empty() {
            out.push(base);
        }
        for f in fields {
            match f.ty {
                Some(ty) => flatten(enumerator, ty, base + f.offset, out),
                None => out.push(base + f.offset),
            }
        }
    }
    let mut leaves = Vec::new();
    flatten(&enumerator, outer.metadata, 0, &mut leaves);
    assert_eq!(leaves, [0, 8]);
}
