// Ranking contract: shortlist bounds, ordering validation, empty-pool
// handling. Invalid judge output must fail the run, never degrade to an
// unranked order.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::MockJudge;
use news_curator::error::CurateError;
use news_curator::pool::{Candidate, PoolAllocation, WeightedPool};
use news_curator::rank::Ranker;

fn pool_of(n: usize) -> WeightedPool {
    let alloc = PoolAllocation::new([("world".to_string(), n)].into());
    let raw = (0..n)
        .map(|i| Candidate {
            url: format!("https://news.example.com/{i}"),
            title: format!("headline {i}"),
            category: "world".to_string(),
            source_count: 1,
        })
        .collect();
    WeightedPool::assemble(&alloc, raw)
}

#[tokio::test]
async fn shortlist_is_never_longer_than_requested() {
    let judge = Arc::new(MockJudge::new().with_rank_order(vec![2, 0, 4]));
    let shortlist = Ranker::new(judge).rank(&pool_of(5), 3).await.unwrap();
    assert_eq!(shortlist.len(), 3);
    assert_eq!(shortlist.entries()[0].title, "headline 2");
    assert_eq!(shortlist.entries()[1].title, "headline 0");
    assert_eq!(shortlist.entries()[2].title, "headline 4");
}

#[tokio::test]
async fn requested_size_is_clamped_to_pool_size() {
    let judge = Arc::new(MockJudge::new().with_rank_order(vec![1, 0]));
    let ranker = Ranker::new(judge.clone());
    let shortlist = ranker.rank(&pool_of(2), 10).await.unwrap();
    assert_eq!(shortlist.len(), 2);
    // the judge was asked for at most the available count
    assert_eq!(judge.rank_requested.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_pool_fails_with_empty_pool_error() {
    let judge = Arc::new(MockJudge::new().with_rank_order(vec![0]));
    let err = Ranker::new(judge.clone())
        .rank(&pool_of(0), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, CurateError::EmptyPool));
    // the judge is never consulted for an empty pool
    assert_eq!(judge.rank_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn out_of_range_index_is_a_selection_error() {
    let judge = Arc::new(MockJudge::new().with_rank_order(vec![0, 7]));
    let err = Ranker::new(judge).rank(&pool_of(3), 2).await.unwrap_err();
    assert!(matches!(err, CurateError::ArticleSelection(_)));
}

#[tokio::test]
async fn duplicate_index_is_a_selection_error() {
    let judge = Arc::new(MockJudge::new().with_rank_order(vec![1, 1]));
    let err = Ranker::new(judge).rank(&pool_of(3), 2).await.unwrap_err();
    assert!(matches!(err, CurateError::ArticleSelection(_)));
}

#[tokio::test]
async fn judge_failure_is_a_selection_error_not_a_fallback() {
    let judge = Arc::new(MockJudge::new().failing_rank());
    let err = Ranker::new(judge).rank(&pool_of(3), 2).await.unwrap_err();
    assert!(matches!(err, CurateError::ArticleSelection(_)));
}
