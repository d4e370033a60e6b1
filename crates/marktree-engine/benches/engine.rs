use criterion::{Criterion, criterion_group, criterion_main};

use marktree_engine::{Edit, SourceText, UpdateConfig, diff, parse, parse_source, update};

/// Build a realistic mixed document with `sections` repeated section bodies.
fn generate_markdown(sections: usize) -> String {
    let mut out = String::new();
    for i in 0..sections {
        out.push_str(&format!(
            "## Section {i}\n\n\
             Paragraph with *emphasis* and `code` in section {i}.\n\n\
             - item one\n- item two\n  - nested\n\n\
             ```rust\nfn section_{i}() {{}}\n```\n\n"
        ));
    }
    out
}

fn bench_full_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.sample_size(20);

    let small = generate_markdown(10);
    group.bench_function("full_small", |b| {
        b.iter(|| std::hint::black_box(parse(std::hint::black_box(&small))));
    });

    let large = generate_markdown(200);
    group.bench_function("full_large", |b| {
        b.iter(|| std::hint::black_box(parse(std::hint::black_box(&large))));
    });

    group.finish();
}

fn bench_incremental_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    group.sample_size(20);

    let content = generate_markdown(200);
    let src = SourceText::new(content);
    let doc = parse_source(&src);
    let config = UpdateConfig::default();

    // Typing inside the first paragraph: the local splice path.
    let local = Edit::insert(20.into(), "x");
    let local_text = local.apply(&src);
    group.bench_function("local_keystroke", |b| {
        b.iter(|| std::hint::black_box(update(&doc, &src, &local, &local_text, &config)));
    });

    // Splitting a block: the structural full-reparse path.
    let structural = Edit::insert(20.into(), "\n");
    let structural_text = structural.apply(&src);
    group.bench_function("structural_keystroke", |b| {
        b.iter(|| std::hint::black_box(update(&doc, &src, &structural, &structural_text, &config)));
    });

    group.finish();
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");
    group.sample_size(20);

    let content = generate_markdown(200);
    let src = SourceText::new(content);
    let doc = parse_source(&src);
    let edit = Edit::insert(20.into(), "x");
    let new_text = edit.apply(&src);
    let (updated, _) = update(&doc, &src, &edit, &new_text, &UpdateConfig::default());

    group.bench_function("after_keystroke", |b| {
        b.iter(|| std::hint::black_box(diff(&doc, &updated)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_full_parse,
    bench_incremental_update,
    bench_diff
);
criterion_main!(benches);
