// Weighted-pool assembly: per-category counts match the allocation whenever
// the feed can satisfy it, for a range of allocation shapes.

mod common;

use common::StaticSource;
use news_curator::pool::{Candidate, CandidateSource, PoolAllocation, WeightedPool};

fn candidate(i: usize, category: &str, sources: u32) -> Candidate {
    Candidate {
        url: format!("https://news.example.com/{category}/{i}"),
        title: format!("{category} headline {i}"),
        category: category.to_string(),
        source_count: sources,
    }
}

fn allocation(pairs: &[(&str, usize)]) -> PoolAllocation {
    PoolAllocation::new(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
}

#[test]
fn per_category_counts_match_allocation_across_configs() {
    let configs: Vec<Vec<(&str, usize)>> = vec![
        vec![("world", 8), ("national", 8), ("business", 4)],
        vec![("world", 1)],
        vec![("world", 3), ("business", 3)],
        vec![("world", 0), ("business", 2)],
    ];

    for pairs in configs {
        let alloc = allocation(&pairs);
        // feed has plenty in every category
        let mut raw = Vec::new();
        for (category, _) in &pairs {
            for i in 0..10 {
                raw.push(candidate(i, category, (i % 4) as u32));
            }
        }
        let pool = WeightedPool::assemble(&alloc, raw);

        assert_eq!(pool.len(), alloc.total(), "pool size for {pairs:?}");
        for (category, quota) in &pairs {
            assert_eq!(
                pool.count_in_category(category),
                *quota,
                "category {category} for {pairs:?}"
            );
        }
    }
}

#[test]
fn every_pool_member_belongs_to_a_configured_category() {
    let alloc = allocation(&[("world", 4)]);
    let raw = vec![
        candidate(0, "world", 2),
        candidate(1, "sports", 9),
        candidate(2, "world", 1),
        candidate(3, "weather", 5),
    ];
    let pool = WeightedPool::assemble(&alloc, raw);
    assert!(pool
        .candidates()
        .iter()
        .all(|c| c.category == "world"));
}

#[tokio::test]
async fn source_trait_assembles_through_the_same_path() {
    let alloc = allocation(&[("world", 2), ("business", 1)]);
    let source = StaticSource {
        candidates: vec![
            candidate(0, "world", 1),
            candidate(1, "world", 3),
            candidate(2, "world", 2),
            candidate(3, "business", 1),
        ],
    };
    let pool = source.fetch_weighted_pool(&alloc).await.unwrap();
    assert_eq!(pool.len(), 3);
    assert_eq!(pool.count_in_category("world"), 2);
    assert_eq!(pool.count_in_category("business"), 1);
    // breaking-news weighting: highest source_count first within a category
    assert_eq!(pool.candidates()[0].source_count, 3);
}
