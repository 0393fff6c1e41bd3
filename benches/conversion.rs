//! Benchmarks for the Markdown to DOCX pipeline.
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use mdocx::footnotes::extract_footnotes;
use mdocx::parser::parse;
use mdocx::preprocess::preprocess;
use mdocx::{ConvertOptions, convert};

/// A document exercising most block and inline constructs.
fn sample_document(sections: usize) -> String {
    let mut text = String::new();
    for i in 0..sections {
        text.push_str(&format!(
            "## Section {i}\n\n\
             Some **bold**, *italic* and `code` text with a [link](https://example.com/{i})\
             and a note[^n{i}].\n\n\
             - item one\n- item two\n  - nested\n\n\
             1. first\n2. second\n\n\
             | Name | Value |\n|:-----|------:|\n| a | {i} |\n\n\
             > Quoted text\n\n\
             ```rust\nfn main() {{\n    println!(\"{i}\");\n}}\n```\n\n\
             [^n{i}]: Footnote {i}.\n\n"
        ));
    }
    text
}

// ============================================================================
// Stage Benchmarks
// ============================================================================

fn bench_preprocess(c: &mut Criterion) {
    let text = sample_document(100);
    c.bench_function("preprocess", |b| {
        b.iter(|| preprocess(black_box(&text)));
    });
}

fn bench_parse(c: &mut Criterion) {
    let (body, _) = extract_footnotes(&preprocess(&sample_document(100)));
    c.bench_function("parse", |b| {
        b.iter(|| parse(black_box(&body)).unwrap());
    });
}

// ============================================================================
// End-to-End Benchmarks
// ============================================================================

fn bench_convert(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let text = sample_document(100);
    let options = ConvertOptions::default();

    c.bench_function("convert", |b| {
        b.iter(|| {
            runtime
                .block_on(convert(black_box(&text), "Bench", &options))
                .unwrap()
        });
    });
}

fn bench_convert_chunked(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let text = sample_document(400);
    let options = ConvertOptions::default().with_chunk_threshold(16 * 1024);

    c.bench_function("convert_chunked", |b| {
        b.iter(|| {
            runtime
                .block_on(convert(black_box(&text), "Bench", &options))
                .unwrap()
        });
    });
}

criterion_group!(stages, bench_preprocess, bench_parse);
criterion_group!(end_to_end, bench_convert, bench_convert_chunked);
criterion_main!(stages, end_to_end);
