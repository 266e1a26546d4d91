//! Benchmarks for loading and saving PLY and STL meshes from memory.
//!
//! Run with: cargo bench -p polymesh-io

use std::hint::black_box;
use std::io::Cursor;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polymesh_core::{Color, Component, Element, Mesh, VertexIndex};
use polymesh_io::{read_ply, read_stl, write_ply, write_stl, LoadSettings, NullLogger, SaveSettings};

/// A colored `n` x `n` grid of quads, split into triangles.
fn create_grid(n: u32) -> Mesh {
    let mut mesh = Mesh::triangle_mesh();
    mesh.enable(Element::Vertex, Component::Color);
    mesh.enable(Element::Vertex, Component::Normal);
    for y in 0..=n {
        for x in 0..=n {
            let v = mesh.add_vertex([x as f64, y as f64, 0.0]);
            mesh.set_normal(Element::Vertex, v.index(), [0.0, 0.0, 1.0]);
            mesh.set_color(Element::Vertex, v.index(), Color::rgb((x % 256) as u8, (y % 256) as u8, 128));
        }
    }
    let row = n + 1;
    for y in 0..n {
        for x in 0..n {
            let a = VertexIndex(y * row + x);
            let b = VertexIndex(y * row + x + 1);
            let c = VertexIndex((y + 1) * row + x + 1);
            let d = VertexIndex((y + 1) * row + x);
            let _ = mesh.add_face(&[a, b, c]);
            let _ = mesh.add_face(&[a, c, d]);
        }
    }
    mesh
}

fn encode(mesh: &Mesh, binary: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let settings = SaveSettings::default().with_binary(binary);
    let _ = write_ply(&mut out, mesh, &settings, &mut NullLogger);
    out
}

fn bench_ply_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("ply_load");
    for n in [16u32, 64, 128] {
        let mesh = create_grid(n);
        group.throughput(Throughput::Elements(mesh.face_count() as u64));
        for (label, binary) in [("binary", true), ("ascii", false)] {
            let data = encode(&mesh, binary);
            group.bench_with_input(BenchmarkId::new(label, n), &data, |b, data| {
                b.iter(|| {
                    let mut loaded = Mesh::triangle_mesh();
                    let info = read_ply(
                        Cursor::new(black_box(data.as_slice())),
                        "grid",
                        &mut loaded,
                        &LoadSettings::default(),
                        &mut NullLogger,
                    );
                    black_box(info.is_ok())
                });
            });
        }
    }
    group.finish();
}

fn bench_ply_save(c: &mut Criterion) {
    let mesh = create_grid(64);
    c.bench_function("ply_save_binary_64", |b| b.iter(|| black_box(encode(&mesh, true).len())));
}

fn bench_stl_load(c: &mut Criterion) {
    let mesh = create_grid(64);
    let mut data = Vec::new();
    let _ = write_stl(&mut data, &mesh, &SaveSettings::default(), &mut NullLogger);
    let size = Some(data.len() as u64);
    c.bench_function("stl_load_binary_64", |b| {
        b.iter(|| {
            let mut loaded = Mesh::triangle_mesh();
            let info = read_stl(
                Cursor::new(black_box(data.as_slice())),
                size,
                &mut loaded,
                &LoadSettings::default(),
                &mut NullLogger,
            );
            black_box(info.is_ok())
        });
    });
}

criterion_group!(benches, bench_ply_load, bench_ply_save, bench_stl_load);
criterion_main!(benches);
