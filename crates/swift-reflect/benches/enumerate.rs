// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field Enumeration Benchmark
//!
//! Measures the hot path of reflection over synthesized metadata:
//! - flat struct walk
//! - deep class hierarchy walk (superclass recursion)
//! - resilient class walk once the bounds cache is warm
//! - symbolic-name scanning

#![allow(clippy::uninlined_format_args)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use swift_reflect::abi::mangled::scan_slice;
use swift_reflect::image::{ClassType, MetadataImage, SuperclassRef};
use swift_reflect::{FieldEnumerator, MetadataRef, TypeTable};

const FIELD_COUNTS: [usize; 3] = [4, 16, 64];

fn flat_struct(image: &mut MetadataImage, fields: usize) -> MetadataRef {
    let mut builder = image.struct_type("Flat");
    for i in 0..fields {
        builder = builder.field(&format!("f{}", i), b"Si", i * 8);
    }
    builder.build().expect("struct").metadata
}

fn class_chain(image: &mut MetadataImage, depth: usize, resilient: bool) -> ClassType {
    let mut class = image
        .class_type("Level0")
        .field("f0", b"Si", 16)
        .build()
        .expect("root");
    for level in 1..depth {
        let mut builder = image
            .class_type(&format!("Level{}", level))
            .superclass(&class)
            .field(&format!("f{}", level), b"Si", 16 + level * 8);
        if resilient {
            builder = builder.resilient_superclass(SuperclassRef::Direct(
                class.descriptor.expect("descriptor"),
            ));
        }
        class = builder.build().expect("class");
    }
    class
}

fn bench_struct(c: &mut Criterion) {
    let mut image = MetadataImage::with_capacity(1 << 20);
    let int = image.struct_type("Int").build().expect("int").metadata;
    let types = TypeTable::new().with(&b"Si"[..], int);
    let enumerator = FieldEnumerator::new(&types);

    let mut group = c.benchmark_group("enumerate_struct");
    for fields in FIELD_COUNTS {
        let metadata = flat_struct(&mut image, fields);
        group.bench_with_input(BenchmarkId::from_parameter(fields), &metadata, |b, &m| {
            b.iter(|| {
                let mut sum = 0;
                enumerator.enumerate(black_box(m), |_, offset, _| {
                    sum += offset;
                    true
                });
                sum
            });
        });
    }
    group.finish();
}

fn bench_class_chain(c: &mut Criterion) {
    let mut image = MetadataImage::with_capacity(1 << 20);
    let int = image.struct_type("Int").build().expect("int").metadata;
    let types = TypeTable::new().with(&b"Si"[..], int);

    let mut group = c.benchmark_group("enumerate_class_chain");
    for resilient in [false, true] {
        let leaf = class_chain(&mut image, 8, resilient);
        let enumerator = FieldEnumerator::new(&types).allow_resilient_superclasses(resilient);
        // Warm the bounds caches so only the fast path is measured.
        enumerator.enumerate(leaf.metadata, |_, _, _| true);
        let name = if resilient { "resilient" } else { "fixed" };
        group.bench_function(name, |b| {
            b.iter(|| enumerator.enumerate(black_box(leaf.metadata), |_, _, _| true));
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let plain = b"14MyApplication5ModelV\0";
    let symbolic = b"\x01\x10\x00\x00\x00Sg\x02\x20\x00\x00\x00SD\0";
    c.bench_function("scan_plain", |b| b.iter(|| scan_slice(black_box(plain))));
    c.bench_function("scan_symbolic", |b| b.iter(|| scan_slice(black_box(symbolic))));
}

criterion_group!(benches, bench_struct, bench_class_chain, bench_scan);
criterion_main!(benches);
