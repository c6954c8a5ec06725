//! End-to-end tests for the orchestrator against an in-memory catalog and a
//! mock ranking service that counts its calls.

use async_trait::async_trait;
use data_loader::{CatalogItem, DataIndex, UserProfile, VideoId, WatchEvent};
use ml_client::{
    MLClientError, ModelStatus, RankingService, RecommendResponse, TrainRequest, TrainResponse,
};
use server::{
    EngineConfig, InMemorySessionCache, RecommendError, RecommendationOrchestrator, ServedFrom,
    SessionCache,
};
use sources::{CandidateSource, TrainOutcome};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

// ============================================================================
// Test Fixtures
// ============================================================================

enum Behavior {
    Ids(Vec<&'static str>),
    Empty,
    Hang,
}

struct MockRanking {
    behavior: Behavior,
    recommend_calls: AtomicUsize,
    train_calls: AtomicUsize,
}

impl MockRanking {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            recommend_calls: AtomicUsize::new(0),
            train_calls: AtomicUsize::new(0),
        })
    }

    fn recommend_calls(&self) -> usize {
        self.recommend_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RankingService for MockRanking {
    async fn train(&self, request: &TrainRequest) -> Result<TrainResponse, MLClientError> {
        self.train_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TrainResponse {
            status: "success".to_string(),
            message: Some(format!("Trained on {} users", request.users.len())),
        })
    }

    async fn recommend(
        &self,
        username: &str,
        _count: usize,
        _exclude: &[VideoId],
    ) -> Result<RecommendResponse, MLClientError> {
        self.recommend_calls.fetch_add(1, Ordering::SeqCst);
        let ids = match &self.behavior {
            Behavior::Ids(ids) => ids.iter().map(|id| id.to_string()).collect(),
            Behavior::Empty => Vec::new(),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Vec::new()
            }
        };
        Ok(RecommendResponse {
            status: "success".to_string(),
            username: Some(username.to_string()),
            recommendations: ids,
            message: None,
        })
    }

    async fn status(&self) -> Result<ModelStatus, MLClientError> {
        Ok(ModelStatus {
            trained: self.train_calls.load(Ordering::SeqCst) > 0,
            ..ModelStatus::default()
        })
    }
}

fn watched(video_id: &str) -> WatchEvent {
    WatchEvent {
        video_id: Some(video_id.to_string()),
        title: Some(format!("Video {}", video_id)),
        watched_at: None,
        watch_duration: Some(90),
        completed: true,
    }
}

/// alice: cold start, interested in Science
/// bob: warm start, has watched plain0, no interests
/// Catalog: 3 Science videos, 20 untagged videos
fn build_test_data_index() -> Arc<DataIndex> {
    let mut index = DataIndex::new();

    for i in 0..3 {
        index.upsert_video(
            CatalogItem::new(format!("sci{}", i), format!("Experiment {}", i))
                .with_tags(["Science"]),
        );
    }
    for i in 0..20 {
        index.upsert_video(CatalogItem::new(format!("plain{}", i), format!("Clip {}", i)));
    }

    let mut alice = UserProfile::new("alice");
    alice.interests = vec!["Science".to_string()];
    index.insert_user(alice);

    let mut bob = UserProfile::new("bob");
    bob.watch_history = vec![watched("plain0")];
    index.insert_user(bob);

    Arc::new(index)
}

fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.ranking.recommend_timeout_ms = 100;
    config.ranking.train_before_recommend = false;
    config
}

fn orchestrator_with(index: Arc<DataIndex>, ranking: Arc<MockRanking>) -> RecommendationOrchestrator {
    RecommendationOrchestrator::new(index.clone(), index, ranking, &test_config())
}

fn ids(items: &[sources::Recommendation]) -> Vec<String> {
    items.iter().map(|r| r.video_id().to_string()).collect()
}

// ============================================================================
// Strategy selection
// ============================================================================

#[tokio::test]
async fn test_cold_start_never_calls_ranking() {
    let ranking = MockRanking::new(Behavior::Ids(vec!["plain1"]));
    let orchestrator = orchestrator_with(build_test_data_index(), ranking.clone());

    let response = orchestrator.recommend("alice", 5, false).await.unwrap();

    assert_eq!(ranking.recommend_calls(), 0);
    assert_eq!(response.served_from, ServedFrom::ColdStartFallback);
    assert_eq!(response.items.len(), 5);

    let served: HashSet<String> = ids(&response.items).into_iter().collect();
    assert_eq!(served.len(), 5);
    for sci in ["sci0", "sci1", "sci2"] {
        assert!(served.contains(sci), "missing {}", sci);
    }
    let backfill = response
        .items
        .iter()
        .filter(|r| r.source == CandidateSource::Random)
        .count();
    assert_eq!(backfill, 2);
}

#[tokio::test]
async fn test_warm_start_calls_ranking_first() {
    let ranking = MockRanking::new(Behavior::Ids(vec!["plain2", "plain1"]));
    let orchestrator = orchestrator_with(build_test_data_index(), ranking.clone());

    let response = orchestrator.recommend("bob", 2, false).await.unwrap();

    assert_eq!(ranking.recommend_calls(), 1);
    assert_eq!(response.served_from, ServedFrom::Ranking);
    assert_eq!(ids(&response.items), vec!["plain2", "plain1"]);
}

#[tokio::test]
async fn test_stale_ranked_id_is_backfilled() {
    let ranking = MockRanking::new(Behavior::Ids(vec!["sci1", "gone"]));
    let orchestrator = orchestrator_with(build_test_data_index(), ranking);

    let items = orchestrator.get_recommendations("bob", 2, false).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].video_id(), "sci1");
    assert_eq!(items[1].source, CandidateSource::Random);
    assert!(!["sci1", "gone", "plain0"].contains(&items[1].video_id()));
}

// ============================================================================
// Session cache
// ============================================================================

#[tokio::test]
async fn test_repeat_requests_are_idempotent() {
    let ranking = MockRanking::new(Behavior::Ids(vec!["plain3", "sci0", "plain4"]));
    let orchestrator = orchestrator_with(build_test_data_index(), ranking.clone());

    let first = orchestrator.recommend("bob", 3, false).await.unwrap();
    let second = orchestrator.recommend("bob", 3, false).await.unwrap();

    assert_eq!(first.items, second.items);
    assert_eq!(second.served_from, ServedFrom::CacheHit);
    assert_eq!(ranking.recommend_calls(), 1);

    // Random-heavy cold start path is cached the same way
    let a1 = orchestrator.get_recommendations("alice", 8, false).await.unwrap();
    let a2 = orchestrator.get_recommendations("alice", 8, false).await.unwrap();
    assert_eq!(a1, a2);
}

#[tokio::test]
async fn test_narrower_cache_hit_keeps_full_entry() {
    let ranking = MockRanking::new(Behavior::Ids(vec!["plain3", "sci0", "plain4", "plain5"]));
    let orchestrator = orchestrator_with(build_test_data_index(), ranking.clone());

    let full = orchestrator.recommend("bob", 4, false).await.unwrap();
    let narrow = orchestrator.recommend("bob", 2, false).await.unwrap();
    assert_eq!(narrow.served_from, ServedFrom::CacheHit);
    assert_eq!(narrow.items, full.items[..2].to_vec());

    let again = orchestrator.recommend("bob", 4, false).await.unwrap();
    assert_eq!(again.served_from, ServedFrom::CacheHit);
    assert_eq!(again.items, full.items);
    assert_eq!(ranking.recommend_calls(), 1);
}

#[tokio::test]
async fn test_refresh_never_repeats_previous_result() {
    let ranking = MockRanking::new(Behavior::Empty);
    let orchestrator = orchestrator_with(build_test_data_index(), ranking);

    let first = orchestrator.get_recommendations("alice", 5, false).await.unwrap();
    let refreshed = orchestrator.get_recommendations("alice", 5, true).await.unwrap();

    assert_eq!(refreshed.len(), 5);
    let before: HashSet<String> = ids(&first).into_iter().collect();
    assert!(ids(&refreshed).iter().all(|id| !before.contains(id)));

    // A second refresh avoids everything served so far
    let again = orchestrator.get_recommendations("alice", 5, true).await.unwrap();
    let refreshed: HashSet<String> = ids(&refreshed).into_iter().collect();
    assert!(ids(&again).iter().all(|id| !before.contains(id) && !refreshed.contains(id)));
}

#[tokio::test]
async fn test_concurrent_refreshes_do_not_overlap() {
    let ranking = MockRanking::new(Behavior::Empty);
    let orchestrator = orchestrator_with(build_test_data_index(), ranking);
    orchestrator.get_recommendations("alice", 5, false).await.unwrap();

    let (a, b) = tokio::join!(
        orchestrator.get_recommendations("alice", 5, true),
        orchestrator.get_recommendations("alice", 5, true)
    );
    let a: HashSet<String> = ids(&a.unwrap()).into_iter().collect();
    let b: HashSet<String> = ids(&b.unwrap()).into_iter().collect();

    assert_eq!(a.len(), 5);
    assert_eq!(b.len(), 5);
    assert!(a.is_disjoint(&b));
}

#[tokio::test]
async fn test_end_session_forgets_history() {
    let ranking = MockRanking::new(Behavior::Empty);
    let orchestrator = orchestrator_with(build_test_data_index(), ranking);

    orchestrator.get_recommendations("alice", 5, false).await.unwrap();
    assert!(orchestrator.end_session("alice").await);
    assert!(!orchestrator.end_session("alice").await);

    let response = orchestrator.recommend("alice", 5, false).await.unwrap();
    assert_eq!(response.served_from, ServedFrom::ColdStartFallback);
}

#[tokio::test]
async fn test_cached_result_with_watched_item_is_recomputed() {
    let ranking = MockRanking::new(Behavior::Ids(vec!["plain7"]));
    let cache = Arc::new(InMemorySessionCache::default());
    let orchestrator =
        orchestrator_with(build_test_data_index(), ranking.clone()).with_session_cache(cache.clone());

    // bob has since watched plain0, which the session still holds
    let stale = vec![sources::Recommendation {
        item: CatalogItem::new("plain0", "Clip 0"),
        source: CandidateSource::Random,
    }];
    cache.record_served("bob", &stale, 1).await;

    let response = orchestrator.recommend("bob", 1, false).await.unwrap();
    assert_eq!(response.served_from, ServedFrom::Ranking);
    assert_eq!(ids(&response.items), vec!["plain7"]);

    let entry = cache.get("bob").await.unwrap();
    assert_eq!(ids(&entry.last_served), vec!["plain7"]);
    assert!(entry.previously_served.contains("plain0"));
    assert!(entry.previously_served.contains("plain7"));
}

// ============================================================================
// Invariants
// ============================================================================

#[tokio::test]
async fn test_ranker_proposing_only_watched_ids_is_backfilled() {
    let ranking = MockRanking::new(Behavior::Ids(vec!["plain0"]));
    let orchestrator = orchestrator_with(build_test_data_index(), ranking);

    let first = orchestrator.recommend("bob", 5, false).await.unwrap();
    assert_eq!(first.served_from, ServedFrom::Ranking);
    assert_eq!(first.items.len(), 5);
    assert!(first.items.iter().all(|r| r.video_id() != "plain0"));

    // The cached answer is the backfilled one, not an empty list
    let second = orchestrator.recommend("bob", 5, false).await.unwrap();
    assert_eq!(second.served_from, ServedFrom::CacheHit);
    assert_eq!(second.items, first.items);
}

#[tokio::test]
async fn test_watched_items_never_served() {
    // The ranker ignores the exclusion list and returns bob's watched video
    let ranking = MockRanking::new(Behavior::Ids(vec!["plain0", "plain5", "plain0"]));
    let orchestrator = orchestrator_with(build_test_data_index(), ranking);

    let items = orchestrator.get_recommendations("bob", 23, false).await.unwrap();

    // 23 videos, 1 watched
    assert_eq!(items.len(), 22);
    assert_eq!(items[0].video_id(), "plain5");
    assert!(items.iter().all(|r| r.video_id() != "plain0"));
    let distinct: HashSet<&str> = items.iter().map(|r| r.video_id()).collect();
    assert_eq!(distinct.len(), items.len());
}

#[tokio::test]
async fn test_result_capped_at_count() {
    let ranking = MockRanking::new(Behavior::Empty);
    let orchestrator = orchestrator_with(build_test_data_index(), ranking);

    for count in [1, 7, 16] {
        orchestrator.end_session("alice").await;
        let items = orchestrator.get_recommendations("alice", count, false).await.unwrap();
        assert_eq!(items.len(), count);
    }

    orchestrator.end_session("alice").await;
    let everything = orchestrator.get_recommendations("alice", 100, false).await.unwrap();
    assert_eq!(everything.len(), 23);

    let none = orchestrator.recommend("alice", 0, false).await.unwrap();
    assert!(none.items.is_empty());
    assert_eq!(none.served_from, ServedFrom::NothingRequested);
}

// ============================================================================
// Degradation
// ============================================================================

#[tokio::test]
async fn test_ranking_timeout_falls_back_to_content() {
    let mut index = DataIndex::new();
    for i in 0..5 {
        index.upsert_video(CatalogItem::new(format!("x{}", i), format!("Clip {}", i)));
    }
    let mut carol = UserProfile::new("carol");
    carol.watch_history = vec![watched("x0")];
    index.insert_user(carol);

    let ranking = MockRanking::new(Behavior::Hang);
    let orchestrator = orchestrator_with(Arc::new(index), ranking.clone());

    let started = Instant::now();
    let response = orchestrator.recommend("carol", 4, false).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(ranking.recommend_calls(), 1);
    assert_eq!(response.served_from, ServedFrom::RankingFallback);

    // Same set the content fallback alone yields: every unwatched video
    let served: HashSet<String> = ids(&response.items).into_iter().collect();
    let expected: HashSet<String> = ["x1", "x2", "x3", "x4"].iter().map(|s| s.to_string()).collect();
    assert_eq!(served, expected);
}

#[tokio::test]
async fn test_empty_ranking_falls_back_to_content() {
    let ranking = MockRanking::new(Behavior::Empty);
    let orchestrator = orchestrator_with(build_test_data_index(), ranking.clone());

    let response = orchestrator.recommend("bob", 4, false).await.unwrap();

    assert_eq!(ranking.recommend_calls(), 1);
    assert_eq!(response.served_from, ServedFrom::RankingFallback);
    assert_eq!(response.items.len(), 4);
    assert!(response.items.iter().all(|r| r.video_id() != "plain0"));
}

#[tokio::test]
async fn test_unknown_user_is_the_only_error() {
    let ranking = MockRanking::new(Behavior::Empty);
    let orchestrator = orchestrator_with(build_test_data_index(), ranking);

    let err = orchestrator
        .get_recommendations("mallory", 5, false)
        .await
        .unwrap_err();
    assert!(matches!(err, RecommendError::UserNotFound(ref name) if name == "mallory"));
    assert_eq!(err.to_string(), "User not found: mallory");
}

// ============================================================================
// Training
// ============================================================================

#[tokio::test]
async fn test_explicit_training_uses_users_with_history() {
    let ranking = MockRanking::new(Behavior::Empty);
    let orchestrator = orchestrator_with(build_test_data_index(), ranking.clone());

    let outcome = orchestrator.train_ranking_model().await.unwrap();
    assert_eq!(
        outcome,
        TrainOutcome::Trained {
            users: 1,
            videos: 23,
            message: Some("Trained on 1 users".to_string()),
        }
    );
    assert!(orchestrator.ranking_status().await.unwrap().trained);
}

#[tokio::test]
async fn test_background_training_does_not_block_request() {
    let ranking = MockRanking::new(Behavior::Ids(vec!["plain1"]));
    let mut config = test_config();
    config.ranking.train_before_recommend = true;
    let index = build_test_data_index();
    let orchestrator = RecommendationOrchestrator::new(index.clone(), index, ranking.clone(), &config);

    let response = orchestrator.recommend("bob", 1, false).await.unwrap();
    assert_eq!(ids(&response.items), vec!["plain1"]);

    // Give the detached refit a moment to land
    for _ in 0..50 {
        if ranking.train_calls.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(ranking.train_calls.load(Ordering::SeqCst), 1);
}
