use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mindsvg::ir::{Direction, TopicData, parse_mindmap};
use mindsvg::render::{RenderOptions, render_svg, render_with_options};
use mindsvg::surface::{FixedContainer, MindMap};
use mindsvg::theme::Theme;
use std::hint::black_box;
use std::rc::Rc;

fn generated_tree(breadth: usize, depth: usize) -> TopicData {
    fn grow(title: String, breadth: usize, depth: usize) -> TopicData {
        let children = if depth == 0 {
            Vec::new()
        } else {
            (0..breadth)
                .map(|i| grow(format!("{title}.{i}"), breadth, depth - 1))
                .collect()
        };
        let mut topic = TopicData::titled(title);
        if depth > 1 {
            topic.labels = Some(vec!["tag".to_string(); breadth.min(5)]);
        }
        topic.with_children(children)
    }

    let mut root = grow("Root".to_string(), breadth, depth);
    for (index, child) in root.children.iter_mut().enumerate() {
        if index % 2 == 1 {
            child.direction = Some(Direction::Left);
        }
    }
    root
}

fn generated_source(breadth: usize, depth: usize) -> String {
    serde_json::to_string(&generated_tree(breadth, depth)).expect("tree serialises")
}

const SHAPES: [(&str, usize, usize); 4] = [
    ("tiny", 3, 2),
    ("wide", 12, 2),
    ("deep", 2, 8),
    ("large", 5, 4),
];

fn shown(breadth: usize, depth: usize) -> MindMap {
    let mut map = MindMap::new(Rc::new(FixedContainer::new(1200.0, 800.0)));
    map.show(&generated_tree(breadth, depth));
    map
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, breadth, depth) in SHAPES {
        let input = generated_source(breadth, depth);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, data| {
            b.iter(|| {
                let parsed = parse_mindmap(black_box(data)).expect("parse failed");
                black_box(parsed.children.len());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    for (name, breadth, depth) in SHAPES {
        let mut map = shown(breadth, depth);
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                map.fold(0);
                black_box(map.layout().topics.len());
            });
        });
    }
    group.finish();
}

fn bench_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold");
    let mut map = shown(5, 4);
    for level in [1, 2, 3] {
        group.bench_function(BenchmarkId::from_parameter(level), |b| {
            b.iter(|| {
                map.fold(black_box(level));
                map.fold(0);
            });
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let theme = Theme::classic();
    for (name, breadth, depth) in SHAPES {
        let map = shown(breadth, depth);
        group.bench_with_input(BenchmarkId::from_parameter(name), &map, |b, data| {
            b.iter(|| {
                let svg = render_svg(black_box(data), &theme);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    for (name, breadth, depth) in SHAPES {
        let input = generated_source(breadth, depth);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, data| {
            b.iter(|| {
                let svg =
                    render_with_options(black_box(data), RenderOptions::default()).expect("render failed");
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_parse, bench_layout, bench_fold, bench_render, bench_end_to_end
);
criterion_main!(benches);
