use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use family_tree_layout::config::{LayoutConfig, LinkStyle};
use family_tree_layout::ir::{Gender, Person};
use family_tree_layout::layout::{LayoutHints, create_links, position_tree};
use family_tree_layout::parser::parse_family;
use std::hint::black_box;

/// Focal person `root` with `generations` of married descendants, each
/// couple having `fanout` children.
fn descendants(generations: usize, fanout: usize) -> Vec<Person> {
    let mut persons = vec![Person::new("root").with_gender(Gender::Male)];
    let mut frontier = vec![0usize];
    for generation in 0..generations {
        let mut next = Vec::new();
        for &parent in &frontier {
            let parent_id = persons[parent].id.clone();
            let spouse_id = format!("{parent_id}-sp");
            let mut spouse = Person::new(spouse_id.clone())
                .with_gender(Gender::Female)
                .with_spouses([parent_id.clone()]);
            persons[parent].relationships.spouses.push(spouse_id.clone());
            for n in 0..fanout {
                let child_id = format!("{parent_id}.{n}");
                let gender = if (generation + n) % 2 == 0 { Gender::Male } else { Gender::Female };
                let child = Person::new(child_id.clone())
                    .with_gender(gender)
                    .with_parents([parent_id.clone(), spouse_id.clone()]);
                persons[parent].relationships.children.push(child_id.clone());
                spouse.relationships.children.push(child_id);
                next.push(persons.len());
                persons.push(child);
            }
            persons.push(spouse);
        }
        frontier = next;
    }
    persons
}

/// Complete pedigree of `generations` above `root`.
fn pedigree(generations: usize) -> Vec<Person> {
    let mut persons = vec![Person::new("root")];
    let mut frontier = vec![0usize];
    for _ in 0..generations {
        let mut next = Vec::new();
        for &child in &frontier {
            let child_id = persons[child].id.clone();
            let father = format!("{child_id}f");
            let mother = format!("{child_id}m");
            persons[child].relationships.parents = vec![father.clone(), mother.clone()];
            for (id, gender) in [(father, Gender::Male), (mother, Gender::Female)] {
                next.push(persons.len());
                persons.push(
                    Person::new(id)
                        .with_gender(gender)
                        .with_children([child_id.clone()]),
                );
            }
        }
        frontier = next;
    }
    persons
}

fn bench_position(c: &mut Criterion) {
    let mut group = c.benchmark_group("position_tree");
    let config = LayoutConfig::default();
    let hints = LayoutHints::default();
    for (name, persons) in [
        ("descendants_4x3", descendants(4, 3)),
        ("descendants_6x2", descendants(6, 2)),
        ("pedigree_8", pedigree(8)),
        ("pedigree_10", pedigree(10)),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &persons, |b, persons| {
            b.iter(|| {
                let tree = position_tree(black_box(persons), Some("root"), &config, &hints)
                    .expect("layout failed");
                black_box(tree.len());
            });
        });
    }
    group.finish();
}

fn bench_links(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_links");
    let persons = descendants(5, 3);
    let tree = position_tree(&persons, Some("root"), &LayoutConfig::default(), &LayoutHints::default())
        .expect("layout failed");
    for style in [LinkStyle::Elbow, LinkStyle::Smooth, LinkStyle::Legacy] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{style:?}")), &tree, |b, tree| {
            b.iter(|| black_box(create_links(black_box(tree), style).len()));
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let input = serde_json::to_string(&descendants(5, 3)).expect("serialize failed");
    c.bench_function("parse_family", |b| {
        b.iter(|| black_box(parse_family(black_box(&input)).expect("parse failed").len()));
    });
}

criterion_group!(benches, bench_position, bench_links, bench_parse);
criterion_main!(benches);
