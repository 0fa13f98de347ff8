// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::cell::Cell;

use super::*;
use crate::image::{FieldSpec, MetadataImage, SuperclassRef, TupleElementSpec};

struct Fixture {
    image: MetadataImage,
    int: MetadataRef,
    double: MetadataRef,
    types: TypeTable,
}

impl Fixture {
    fn new() -> Self {
        let mut image = MetadataImage::new();
        let int = image.struct_type("Int").build().expect("int").metadata;
        let double = image.struct_type("Double").build().expect("double").metadata;
        let types = TypeTable::new()
            .with(&b"Si"[..], int)
            .with(&b"Sd"[..], double);
        Self {
            image,
            int,
            double,
            types,
        }
    }
}

fn collect<R: TypeResolver + ?Sized>(
    enumerator: &FieldEnumerator<'_, R>,
    metadata: MetadataRef,
) -> (bool, Vec<(String, usize, Option<MetadataRef>)>) {
    let mut seen = Vec::new();
    let complete = enumerator.enumerate(metadata, |name, offset, ty| {
        seen.push((String::from_utf8_lossy(name).into_owned(), offset, ty));
        true
    });
    (complete, seen)
}

#[test]
fn test_struct_fields_in_order() {
    let mut fx = Fixture::new();
    let s = fx
        .image
        .struct_type("S")
        .field("a", b"Si", 0)
        .field("b", b"Sd", 8)
        .build()
        .expect("struct");

    let (complete, seen) = collect(&FieldEnumerator::new(&fx.types), s.metadata);
    assert!(complete);
    assert_eq!(
        seen,
        [
            ("a".to_string(), 0, Some(fx.int)),
            ("b".to_string(), 8, Some(fx.double)),
        ]
    );
}

#[test]
fn test_superclass_fields_come_first() {
    let mut fx = Fixture::new();
    let base = fx
        .image
        .class_type("Base")
        .field("x", b"Si", 16)
        .build()
        .expect("base");
    let derived = fx
        .image
        .class_type("Derived")
        .superclass(&base)
        .field("y", b"Sd", 24)
        .build()
        .expect("derived");

    let fields = FieldEnumerator::new(&fx.types)
        .fields(derived.metadata)
        .expect("complete");
    assert_eq!(
        fields,
        [
            FieldInfo {
                name: "x".into(),
                offset: 16,
                ty: Some(fx.int)
            },
            FieldInfo {
                name: "y".into(),
                offset: 24,
                ty: Some(fx.double)
            },
        ]
    );
}

#[test]
fn test_callback_false_stops_everything() {
    let mut fx = Fixture::new();
    let base = fx
        .image
        .class_type("Base")
        .field("x", b"Si", 16)
        .field("z", b"Si", 24)
        .build()
        .expect("base");
    let derived = fx
        .image
        .class_type("Derived")
        .superclass(&base)
        .field("y", b"Si", 32)
        .build()
        .expect("derived");

    let mut calls = 0;
    let complete = FieldEnumerator::new(&fx.types).enumerate(derived.metadata, |_, _, _| {
        calls += 1;
        false
    });
    assert!(!complete);
    assert_eq!(calls, 1);

    let mut names = Vec::new();
    let complete = FieldEnumerator::new(&fx.types).enumerate(derived.metadata, |name, _, _| {
        names.push(name.to_vec());
        name != b"z"
    });
    assert!(!complete);
    assert_eq!(names, [b"x".to_vec(), b"z".to_vec()]);
}

#[test]
fn test_tuple_labels() {
    let mut fx = Fixture::new();
    let tuple = fx
        .image
        .tuple_type(&[
            TupleElementSpec::new(Some("x"), fx.int, 0),
            TupleElementSpec::new(None, fx.double, 8),
        ])
        .expect("tuple");
    let (complete, seen) = collect(&FieldEnumerator::new(&fx.types), tuple);
    assert!(complete);
    assert_eq!(
        seen,
        [
            ("x".to_string(), 0, Some(fx.int)),
            (String::new(), 8, Some(fx.double)),
        ]
    );

    let unlabeled = fx
        .image
        .tuple_type(&[
            TupleElementSpec::new(None, fx.int, 0),
            TupleElementSpec::new(None, fx.int, 8),
        ])
        .expect("tuple");
    let (_, seen) = collect(&FieldEnumerator::new(&fx.types), unlabeled);
    assert!(seen.iter().all(|(name, _, _)| name.is_empty()));
    assert_eq!(seen.len(), 2);
}

#[test]
fn test_resilient_superclass_policy() {
    let mut fx = Fixture::new();
    let base = fx
        .image
        .class_type("Base")
        .field("x", b"Si", 16)
        .build()
        .expect("base");
    let derived = fx
        .image
        .class_type("Derived")
        .superclass(&base)
        .resilient_superclass(SuperclassRef::Direct(base.descriptor.expect("descriptor")))
        .field("y", b"Sd", 24)
        .build()
        .expect("derived");

    let (complete, seen) = collect(&FieldEnumerator::new(&fx.types), derived.metadata);
    assert!(!complete);
    assert!(seen.is_empty(), "refusal happens before the superclass walk");
    assert!(FieldEnumerator::new(&fx.types).fields(derived.metadata).is_none());

    let allowing = FieldEnumerator::new(&fx.types).allow_resilient_superclasses(true);
    assert!(allowing.config().allow_resilient_superclasses);
    let (complete, seen) = collect(&allowing, derived.metadata);
    assert!(complete);
    assert_eq!(
        seen,
        [
            ("x".to_string(), 16, Some(fx.int)),
            ("y".to_string(), 24, Some(fx.double)),
        ]
    );

    let configured = FieldEnumerator::new(&fx.types)
        .with_config(ReflectConfig::new().with_resilient_superclasses(true));
    assert!(configured.enumerate(derived.metadata, |_, _, _| true));
}

#[test]
fn test_resilient_superclass_through_foreign_lookup() {
    let mut fx = Fixture::new();
    let objc = fx.image.objc_class(None).expect("objc");
    let sub = fx
        .image
        .class_type("Sub")
        .superclass(&objc)
        .resilient_superclass(SuperclassRef::ForeignName("NSObject".into()))
        .field("a", b"Si", 16)
        .build()
        .expect("sub");
    let foreign = TypeTable::new().with(&b"NSObject"[..], objc.metadata);

    let fields = FieldEnumerator::new(&fx.types)
        .allow_resilient_superclasses(true)
        .with_foreign_classes(&foreign)
        .fields(sub.metadata)
        .expect("complete");
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].offset, 16);
}

#[test]
fn test_generic_arguments_reach_the_resolver() {
    let mut fx = Fixture::new();
    let boxed = fx
        .image
        .struct_type("Box")
        .generic_args(&[fx.double])
        .field("value", b"x", 0)
        .build()
        .expect("box");
    let generic_class = fx
        .image
        .class_type("Holder")
        .generic_args(&[fx.int])
        .field("held", b"x", 16)
        .build()
        .expect("holder");

    // "x" is the first generic parameter.
    let resolver = resolver_fn(|name, context, args| {
        assert!(context.is_generic());
        match name.as_bytes() {
            // SAFETY: both types have exactly one key argument.
            b"x" => args.and_then(|args| unsafe { args.get(0) }),
            _ => None,
        }
    });
    let enumerator = FieldEnumerator::new(&resolver);
    let (_, seen) = collect(&enumerator, boxed.metadata);
    assert_eq!(seen, [("value".to_string(), 0, Some(fx.double))]);
    let (_, seen) = collect(&enumerator, generic_class.metadata);
    assert_eq!(seen, [("held".to_string(), 16, Some(fx.int))]);
}

#[test]
fn test_generic_class_with_resilient_superclass() {
    let mut fx = Fixture::new();
    let base = fx
        .image
        .class_type("Base")
        .field("x", b"Si", 16)
        .extra_members(3)
        .build()
        .expect("base");
    let derived = fx
        .image
        .class_type("Derived")
        .superclass(&base)
        .resilient_superclass(SuperclassRef::Indirect(base.descriptor.expect("descriptor")))
        .generic_args(&[fx.double])
        .field("y", b"x", 24)
        .build()
        .expect("derived");

    let resolver = resolver_fn(|name, _, args| match name.as_bytes() {
        // SAFETY: Derived has one key argument.
        b"x" => args.and_then(|args| unsafe { args.get(0) }),
        b"Si" => Some(fx.int),
        _ => None,
    });
    let fields = FieldEnumerator::new(&resolver)
        .allow_resilient_superclasses(true)
        .fields(derived.metadata)
        .expect("complete");
    assert_eq!(fields[0].ty, Some(fx.int));
    assert_eq!(fields[1].offset, 24);
    assert_eq!(fields[1].ty, Some(fx.double));
}

#[test]
fn test_value_generic_class_with_resilient_superclass() {
    let mut fx = Fixture::new();
    let base = fx
        .image
        .class_type("Base")
        .field("x", b"Si", 16)
        .build()
        .expect("base");
    let derived = fx
        .image
        .class_type("Buffer")
        .superclass(&base)
        .resilient_superclass(SuperclassRef::Direct(base.descriptor.expect("descriptor")))
        .generic_args(&[fx.double])
        .generic_values(&[4])
        .field("y", b"x", 24)
        .build()
        .expect("derived");

    let count = Cell::new(None);
    let resolver = resolver_fn(|name, _, args| match name.as_bytes() {
        b"x" => args.and_then(|args| {
            // SAFETY: Buffer has a type argument followed by one value.
            count.set(Some(unsafe { *args.as_ptr().add(1) } as usize));
            // SAFETY: as above.
            unsafe { args.get(0) }
        }),
        b"Si" => Some(fx.int),
        _ => None,
    });
    let fields = FieldEnumerator::new(&resolver)
        .allow_resilient_superclasses(true)
        .fields(derived.metadata)
        .expect("complete");
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[1].offset, 24);
    assert_eq!(fields[1].ty, Some(fx.double));
    assert_eq!(count.get(), Some(4));
}

#[test]
fn test_foreign_bounds_larger_than_the_metadata_are_refused() {
    let mut fx = Fixture::new();
    let objc = fx.image.objc_class(None).expect("objc");
    let huge = fx.image.class_type("Huge").extra_members(64).build().expect("huge");
    let sub = fx
        .image
        .class_type("Sub")
        .superclass(&objc)
        .resilient_superclass(SuperclassRef::ForeignName("NSObject".into()))
        .field("a", b"Si", 16)
        .build()
        .expect("sub");
    // The lookup claims a superclass far larger than the one Sub was laid
    // out from.
    let foreign = TypeTable::new().with(&b"NSObject"[..], huge.metadata);

    let mut calls = 0;
    let complete = FieldEnumerator::new(&fx.types)
        .allow_resilient_superclasses(true)
        .with_foreign_classes(&foreign)
        .enumerate(sub.metadata, |_, _, _| {
            calls += 1;
            true
        });
    assert!(!complete);
    assert_eq!(calls, 0);
}

#[test]
fn test_missing_field_descriptor_is_empty_success() {
    let mut fx = Fixture::new();
    let s = fx
        .image
        .struct_type("Stripped")
        .field("a", b"Si", 0)
        .without_field_descriptor()
        .build()
        .expect("struct");
    let class = fx
        .image
        .class_type("StrippedClass")
        .field("a", b"Si", 16)
        .without_field_descriptor()
        .build()
        .expect("class");

    for metadata in [s.metadata, class.metadata] {
        let (complete, seen) = collect(&FieldEnumerator::new(&fx.types), metadata);
        assert!(complete);
        assert!(seen.is_empty());
    }
}

#[test]
fn test_artificial_subclass_reports_ancestors_only() {
    let mut fx = Fixture::new();
    let base = fx
        .image
        .class_type("Base")
        .field("x", b"Si", 16)
        .build()
        .expect("base");
    let artificial = fx
        .image
        .class_type("Artificial")
        .superclass(&base)
        .field("hidden", b"Si", 24)
        .without_description()
        .build()
        .expect("artificial");

    let (complete, seen) = collect(&FieldEnumerator::new(&fx.types), artificial.metadata);
    assert!(complete);
    assert_eq!(seen, [("x".to_string(), 16, Some(fx.int))]);
}

#[test]
fn test_objc_classes_contribute_nothing() {
    let mut fx = Fixture::new();
    let objc = fx.image.objc_class(None).expect("objc");
    let (complete, seen) = collect(&FieldEnumerator::new(&fx.types), objc.metadata);
    assert!(complete);
    assert!(seen.is_empty());

    let swift_sub = fx
        .image
        .class_type("SwiftSub")
        .superclass(&objc)
        .field("a", b"Si", 16)
        .build()
        .expect("sub");
    let (complete, seen) = collect(&FieldEnumerator::new(&fx.types), swift_sub.metadata);
    assert!(complete);
    assert_eq!(seen, [("a".to_string(), 16, Some(fx.int))]);
}

#[test]
fn test_kinds_without_fields() {
    let mut fx = Fixture::new();
    for kind in [
        MetadataKind::Enum,
        MetadataKind::Optional,
        MetadataKind::Function,
        MetadataKind::Existential,
        MetadataKind::Metatype,
        MetadataKind::Unknown(0x7FF),
    ] {
        let metadata = fx.image.opaque_type(kind).expect("metadata");
        let mut calls = 0;
        assert!(FieldEnumerator::new(&fx.types).enumerate(metadata, |_, _, _| {
            calls += 1;
            true
        }));
        assert_eq!(calls, 0, "{:?}", kind);
    }
}

#[test]
fn test_unresolved_and_missing_type_names() {
    let mut fx = Fixture::new();
    let s = fx
        .image
        .struct_type("Odd")
        .field("unknown", b"7Unknown", 0)
        .field_spec(FieldSpec::untyped("untyped", 8))
        .field_spec(FieldSpec::unnamed(b"Si", 16))
        .build()
        .expect("struct");

    let calls = Cell::new(0);
    let counting = resolver_fn(|name, _, _| {
        calls.set(calls.get() + 1);
        fx.types.get(name.as_bytes())
    });
    let (complete, seen) = collect(&FieldEnumerator::new(&counting), s.metadata);
    assert!(complete);
    assert_eq!(
        seen,
        [
            ("unknown".to_string(), 0, None),
            ("untyped".to_string(), 8, None),
            (String::new(), 16, Some(fx.int)),
        ]
    );
    // The record without a type name never reaches the resolver.
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_enumerate_fields_raw_entry_point() {
    let mut fx = Fixture::new();
    let s = fx
        .image
        .struct_type("S")
        .field("a", b"Si", 0)
        .build()
        .expect("struct");

    let mut seen = Vec::new();
    // SAFETY: `s.metadata` comes from a live image.
    let complete = unsafe {
        enumerate_fields(s.metadata.as_ptr(), false, &fx.types, |name, offset, ty| {
            seen.push((name.to_vec(), offset, ty));
            true
        })
    };
    assert!(complete);
    assert_eq!(seen, [(b"a".to_vec(), 0, Some(fx.int))]);

    // SAFETY: null is rejected up front.
    let complete = unsafe { enumerate_fields(std::ptr::null(), true, &fx.types, |_, _, _| true) };
    assert!(!complete);
}

#[test]
fn test_dyn_resolver() {
    let fx = Fixture::new();
    let resolver: &dyn TypeResolver = &fx.types;
    let enumerator = FieldEnumerator::new(resolver);
    assert!(enumerator.enumerate(fx.int, |_, _, _| true));
    assert!(format!("{:?}", enumerator).starts_with("FieldEnumerator"));
}
