//! Performance benchmarks for model canonicalization and program encoding.
//!
//! Run with: `cargo bench --bench canonicalize`
//!
//! | Operation | Notes |
//! |-----------|-------|
//! | Canonicalize | Sort, dedupe and name one solution |
//! | Intersection | Common atoms across all models |
//! | Encode | Program text for many users |
//! | Render | Default title + table chains |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use preference_kernel::repr::{Labels, Pipeline, Statistics};
use preference_kernel::types::intersection;
use preference_kernel::{encoder, Atom, CanonicalModel, Configuration, RawSolution, UserChoiceSet, Value};

/// A solution assigning `users` users to 10 slots, in reverse order.
fn make_solution(users: usize, salt: usize) -> RawSolution {
    let mut atoms: Vec<Atom> = (0..users)
        .map(|u| {
            Atom::new(
                "assoc",
                vec![Value::Sym(format!("u{}", u)), Value::Int(((u + salt) % 10) as i64)],
            )
        })
        .collect();
    atoms.reverse();
    RawSolution::new(atoms)
}

fn bench_canonicalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonicalize");

    for atom_count in [10, 100, 1000] {
        let solution = make_solution(atom_count, 0);
        group.throughput(Throughput::Elements(atom_count as u64));
        group.bench_with_input(BenchmarkId::new("atoms", atom_count), &solution, |b, solution| {
            b.iter(|| CanonicalModel::from_raw(black_box(solution), 3))
        });
    }

    group.finish();
}

fn bench_intersection(c: &mut Criterion) {
    let models: Vec<CanonicalModel> = (0..50)
        .map(|salt| CanonicalModel::from_raw(&make_solution(200, salt % 3), 3))
        .collect();

    c.bench_function("intersection_50_models", |b| {
        b.iter(|| intersection(black_box(&models[0]), black_box(&models[1..])))
    });
}

fn bench_encode(c: &mut Criterion) {
    let config = Configuration::from_json_str(
        r#"{
            "global": {"base_encoding": "1 { assoc(U,S): slot(S) } 1 :- user(U).", "shows": ["assoc/2"]},
            "choice_groups": [{
                "items": ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"],
                "produced_atoms": ["available({user},{choice})"],
                "data_atoms": ["user({user})", "slot({choice})"]
            }]
        }"#,
    )
    .unwrap();

    let mut group = c.benchmark_group("encode");

    for users in [10, 100, 500] {
        let mut choices = UserChoiceSet::new();
        for u in 0..users {
            let selection = (0..10).filter(|i| (i + u) % 3 != 0).map(|i| i.to_string()).collect();
            choices.set_all(&format!("u{}", u), vec![selection]);
        }
        group.bench_with_input(BenchmarkId::new("users", users), &choices, |b, choices| {
            b.iter(|| encoder::encode(&config, black_box(choices)))
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let config = Configuration::from_json_str(r#"{"choice_groups": [{"items": ["0"]}]}"#).unwrap();
    let pipeline = Pipeline::new(&config.output);
    let labels = Labels::from_config(&config);
    let models: Vec<CanonicalModel> = (0..20)
        .map(|salt| CanonicalModel::from_raw(&make_solution(30, salt), 3))
        .collect();
    let stats = Statistics {
        nb_models: models.len(),
        runtime: Duration::from_millis(120),
        common_atoms: Some(intersection(&models[0], &models[1..])),
    };

    c.bench_function("render_20_models", |b| {
        b.iter(|| pipeline.render(&labels, black_box(&models), &stats))
    });
}

criterion_group!(benches, bench_canonicalize, bench_intersection, bench_encode, bench_render);
criterion_main!(benches);
