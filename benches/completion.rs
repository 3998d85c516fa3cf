use std::hint::black_box;
use std::path::Path;

use criterion::{Criterion, criterion_group, criterion_main};

use cppcomplete_lsp::completion::ranking;
use cppcomplete_lsp::config::CaseSensitivity;
use cppcomplete_lsp::{CompletionSettings, Snapshot, start_completion};

/// A translation unit with `classes` classes of `members` members each,
/// derived in a chain, ending in a function that completes on the last.
fn generated_source(classes: usize, members: usize) -> (String, usize) {
    let mut src = String::new();
    for c in 0..classes {
        if c == 0 {
            src.push_str("struct Class0 {\n");
        } else {
            src.push_str(&format!("struct Class{c} : public Class{} {{\n", c - 1));
        }
        for m in 0..members {
            src.push_str(&format!("    int field_{c}_{m};\n"));
            src.push_str(&format!("    void method_{c}_{m}(int a, double b = 0.0);\n"));
        }
        src.push_str("};\n\n");
    }
    src.push_str(&format!(
        "void run(Class{} *object) {{\n    int local = 0;\n    object->",
        classes - 1
    ));
    let cursor = src.len();
    src.push_str("\n}\n");
    (src, cursor)
}

fn bench_member_completion(c: &mut Criterion) {
    let (src, cursor) = generated_source(20, 25);
    let settings = CompletionSettings::default();
    let snapshot = Snapshot::new();
    let path = Path::new("/bench/member.cpp");

    c.bench_function("member_access_inheritance_chain", |b| {
        b.iter(|| {
            let proposal =
                start_completion(&snapshot, &settings, path, black_box(&src), cursor);
            black_box(proposal.map(|p| p.candidates.len()))
        })
    });
}

fn bench_global_completion(c: &mut Criterion) {
    let (mut src, _) = generated_source(20, 25);
    src.push_str("void other() {\n    met");
    let cursor = src.len();
    src.push_str("\n}\n");
    let settings = CompletionSettings::default();
    let snapshot = Snapshot::new();
    let path = Path::new("/bench/global.cpp");

    c.bench_function("global_scope_walk", |b| {
        b.iter(|| {
            let proposal =
                start_completion(&snapshot, &settings, path, black_box(&src), cursor);
            black_box(proposal.map(|p| p.candidates.len()))
        })
    });
}

fn bench_filtering(c: &mut Criterion) {
    let (src, cursor) = generated_source(20, 25);
    let settings = CompletionSettings::default();
    let Some(proposal) =
        start_completion(&Snapshot::new(), &settings, Path::new("/bench/f.cpp"), &src, cursor)
    else {
        return;
    };

    c.bench_function("filter_camel_humps", |b| {
        b.iter(|| {
            let out = ranking::filter(
                black_box(&proposal.candidates),
                "m_1_2",
                CaseSensitivity::FirstLetter,
            );
            black_box(out.len())
        })
    });
}

criterion_group!(
    benches,
    bench_member_completion,
    bench_global_completion,
    bench_filtering
);
criterion_main!(benches);
