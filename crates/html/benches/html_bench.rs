use criterion::{Criterion, black_box, criterion_group, criterion_main};
use html::{ParseOptions, parse, tokenize};

const SMALL_BLOCKS: usize = 64;
const LARGE_BLOCKS: usize = 20_000;

fn make_blocks(blocks: usize) -> String {
    let mut out = String::with_capacity(blocks * 48);
    for i in 0..blocks {
        out.push_str("<div class=box><span>hello ");
        out.push_str(if i % 2 == 0 { "even" } else { "odd" });
        out.push_str("</span><img src=x></div>");
    }
    out
}

fn make_rawtext_adversarial(bytes: usize) -> String {
    let mut body = String::with_capacity(bytes + 32);
    body.push_str("<script>");
    while body.len() < bytes {
        body.push_str("</scri");
        body.push('<');
        body.push_str("pt");
    }
    body.push_str("</script>");
    body
}

fn bench_tokenize_small(c: &mut Criterion) {
    let input = make_blocks(SMALL_BLOCKS);
    c.bench_function("bench_tokenize_small", |b| {
        b.iter(|| {
            let tokens = tokenize(black_box(&input));
            black_box(tokens.len());
        });
    });
}

fn bench_tokenize_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    c.bench_function("bench_tokenize_large", |b| {
        b.iter(|| {
            let tokens = tokenize(black_box(&input));
            black_box(tokens.len());
        });
    });
}

fn bench_tokenize_rawtext_adversarial(c: &mut Criterion) {
    let input = make_rawtext_adversarial(512 * 1024);
    c.bench_function("bench_tokenize_rawtext_adversarial", |b| {
        b.iter(|| {
            let tokens = tokenize(black_box(&input));
            black_box(tokens.len());
        });
    });
}

fn bench_parse_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    let options = ParseOptions::default();
    c.bench_function("bench_parse_large", |b| {
        b.iter(|| {
            let parsed = parse(black_box(&input), &options).expect("parse never fails");
            black_box(parsed.root());
        });
    });
}

fn bench_parse_tables(c: &mut Criterion) {
    let mut input = String::from("<table>");
    for row in 0..2_000 {
        input.push_str("<tr><td>");
        input.push_str(if row % 2 == 0 { "a" } else { "b" });
        input.push_str("<td>c");
    }
    input.push_str("</table>");
    let options = ParseOptions::default();
    c.bench_function("bench_parse_tables", |b| {
        b.iter(|| {
            let parsed = parse(black_box(&input), &options).expect("parse never fails");
            black_box(parsed.root());
        });
    });
}

criterion_group!(
    benches,
    bench_tokenize_small,
    bench_tokenize_large,
    bench_tokenize_rawtext_adversarial,
    bench_parse_large,
    bench_parse_tables,
);
criterion_main!(benches);
