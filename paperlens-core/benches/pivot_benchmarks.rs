use criterion::{Criterion, black_box, criterion_group, criterion_main};
use paperlens_core::config::ColorAssignment;
use paperlens_core::trends::{Palette, pivot, pivot_with};
use paperlens_core::types::{Profile, SearchResponse, TrendRecord};

fn synthetic_records(years: i32, topics: usize) -> Vec<TrendRecord> {
    let mut records = Vec::with_capacity(years as usize * topics);
    for year in 2000..2000 + years {
        for topic in 0..topics {
            // Leave holes so the pivot has to zero-fill.
            if (year as usize + topic) % 3 != 0 {
                records.push(TrendRecord::new(
                    year,
                    format!("topic-{topic}"),
                    (year as u64 * 31 + topic as u64) % 500,
                ));
            }
        }
    }
    records
}

fn bench_pivot(c: &mut Criterion) {
    let small = synthetic_records(5, 8);
    c.bench_function("pivot_small", |b| b.iter(|| pivot(black_box(&small))));

    let large = synthetic_records(25, 120);
    c.bench_function("pivot_large", |b| b.iter(|| pivot(black_box(&large))));

    let hashed = Palette::new(Vec::new(), ColorAssignment::TopicHash);
    c.bench_function("pivot_large_topic_hash", |b| {
        b.iter(|| pivot_with(black_box(&large), &hashed))
    });

    let empty: Vec<TrendRecord> = Vec::new();
    c.bench_function("pivot_empty", |b| b.iter(|| pivot(black_box(&empty))));
}

fn bench_decode(c: &mut Criterion) {
    let results: Vec<_> = (0..50)
        .map(|i| {
            serde_json::json!({
                "id": i,
                "title": format!("Paper {i}"),
                "abstract": "A study of things.",
                "venue": "arXiv",
                "date": "2024-03-01",
                "categories": "cs.LG"
            })
        })
        .collect();
    let search = serde_json::json!({ "results": results }).to_string();
    c.bench_function("decode_search_response", |b| {
        b.iter(|| serde_json::from_str::<SearchResponse>(black_box(&search)))
    });

    let profile = serde_json::json!({
        "id": 1,
        "name": "Ada",
        "title": "Researcher",
        "proposal": "Retrieval-augmented generation",
        "trajectory": "Shifting towards evaluation.",
        "suggested_conferences": "[\"ACL\", \"EMNLP\"]",
        "suggested_papers": "[{\"title\": \"RAG\", \"venue\": \"NeurIPS\", \"year\": 2020}]"
    })
    .to_string();
    c.bench_function("decode_profile_encoded_lists", |b| {
        b.iter(|| serde_json::from_str::<Profile>(black_box(&profile)))
    });
}

criterion_group!(benches, bench_pivot, bench_decode);
criterion_main!(benches);
