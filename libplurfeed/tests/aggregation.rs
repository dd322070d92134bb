//! Aggregation engine behaviour across several adapters
//!
//! These tests cover the engine's guarantees end to end:
//! - merged feeds are ordered newest first for any limit
//! - a failing or panicking platform never affects the others
//! - single-platform operations collapse failures to empty/false
//! - interactions always go to the platform the post came from

use std::sync::Arc;

use anyhow::Result;
use libplurfeed::engine::AggregationEngine;
use libplurfeed::events::{Event, Operation};
use libplurfeed::platforms::mock::{sample_posts, MockAdapter};
use libplurfeed::registry::AdapterRegistry;
use libplurfeed::types::{CredentialMaterial, InteractionData, PlatformId, UnifiedPost};

/// Posts for `platform` with the given timestamps, in the given order
fn posts_at(platform: PlatformId, timestamps: &[i64]) -> Vec<UnifiedPost> {
    sample_posts(platform, timestamps.len(), 0, 0)
        .into_iter()
        .zip(timestamps)
        .map(|(mut post, ts)| {
            post.published_at = *ts;
            post
        })
        .collect()
}

fn engine_with(adapters: Vec<Arc<MockAdapter>>) -> Result<AggregationEngine> {
    let registry = Arc::new(AdapterRegistry::new());
    for adapter in adapters {
        registry.register_adapter(adapter)?;
    }
    Ok(AggregationEngine::new(registry))
}

#[test]
fn test_scenario_five_zero_three() -> Result<()> {
    let x = Arc::new(MockAdapter::with_posts(
        PlatformId::Bluesky,
        sample_posts(PlatformId::Bluesky, 5, 50_000, 1_000),
    ));
    let y = Arc::new(MockAdapter::fetch_failure(
        PlatformId::Mastodon,
        "simulated outage",
    ));
    let z = Arc::new(MockAdapter::with_posts(
        PlatformId::YouTube,
        sample_posts(PlatformId::YouTube, 3, 48_500, 1_000),
    ));
    let engine = engine_with(vec![x.clone(), y.clone(), z.clone()])?;

    let feed = engine.fetch_aggregated_feed(10);

    assert_eq!(feed.len(), 8);
    assert!(feed
        .windows(2)
        .all(|w| w[0].published_at >= w[1].published_at));
    assert!(feed.iter().all(|p| p.platform != PlatformId::Mastodon));
    assert_eq!(
        feed.iter().filter(|p| p.platform == PlatformId::Bluesky).count(),
        5
    );
    assert_eq!(
        feed.iter().filter(|p| p.platform == PlatformId::YouTube).count(),
        3
    );

    assert_eq!(x.fetch_call_count(), 1);
    assert_eq!(y.fetch_call_count(), 1);
    assert_eq!(z.fetch_call_count(), 1);
    Ok(())
}

#[test]
fn test_feed_sorted_for_every_limit() -> Result<()> {
    // Adapters hand back posts in no particular order
    let engine = engine_with(vec![
        Arc::new(MockAdapter::with_posts(
            PlatformId::Instagram,
            posts_at(PlatformId::Instagram, &[300, 900, 100, 900, 500]),
        )),
        Arc::new(MockAdapter::with_posts(
            PlatformId::TikTok,
            posts_at(PlatformId::TikTok, &[50, 1_000, 700]),
        )),
        Arc::new(MockAdapter::with_posts(
            PlatformId::Mastodon,
            posts_at(PlatformId::Mastodon, &[900, -20, 400, 400]),
        )),
    ])?;

    for limit in 0..8 {
        let feed = engine.fetch_aggregated_feed(limit);
        assert!(
            feed.windows(2)
                .all(|w| w[0].published_at >= w[1].published_at),
            "feed for limit {} is not newest first",
            limit
        );
        assert_eq!(feed.len(), limit.min(5) + limit.min(3) + limit.min(4));
    }
    Ok(())
}

#[test]
fn test_posts_always_carry_their_adapter_platform() -> Result<()> {
    let engine = engine_with(
        [PlatformId::Instagram, PlatformId::Bluesky, PlatformId::Mastodon]
            .into_iter()
            .map(|platform| {
                Arc::new(MockAdapter::with_posts(
                    platform,
                    sample_posts(platform, 4, 10_000, 7),
                ))
            })
            .collect(),
    )?;

    for platform in [PlatformId::Instagram, PlatformId::Bluesky, PlatformId::Mastodon] {
        let feed = engine.fetch_platform_feed(platform, 3);
        assert_eq!(feed.len(), 3);
        assert!(feed.iter().all(|p| p.platform == platform));
        assert!(feed.iter().all(|p| p.author.platform == platform));
    }
    Ok(())
}

#[test]
fn test_one_panicking_platform_does_not_stop_the_rest() -> Result<()> {
    let engine = engine_with(vec![
        Arc::new(MockAdapter::panicking(PlatformId::Instagram)),
        Arc::new(MockAdapter::fetch_failure(PlatformId::TikTok, "HTTP 503")),
        Arc::new(MockAdapter::with_posts(
            PlatformId::Mastodon,
            sample_posts(PlatformId::Mastodon, 2, 1_000, 1),
        )),
    ])?;

    let report = engine.fetch_aggregated_report(10);
    assert_eq!(report.posts.len(), 2);
    assert_eq!(report.succeeded, vec![PlatformId::Mastodon]);
    assert_eq!(
        report.failed_platforms(),
        vec![PlatformId::Instagram, PlatformId::TikTok]
    );
    Ok(())
}

#[test]
fn test_all_platforms_failing_yields_empty_feed() -> Result<()> {
    let engine = engine_with(vec![
        Arc::new(MockAdapter::fetch_failure(PlatformId::YouTube, "quota")),
        Arc::new(MockAdapter::panicking(PlatformId::Bluesky)),
    ])?;

    assert!(engine.fetch_aggregated_feed(10).is_empty());
    Ok(())
}

#[test]
fn test_unregistered_platform_feed_is_empty_and_reported() -> Result<()> {
    let engine = engine_with(vec![Arc::new(MockAdapter::with_posts(
        PlatformId::Bluesky,
        sample_posts(PlatformId::Bluesky, 2, 1_000, 1),
    ))])?;
    let mut events = engine.subscribe();

    assert!(engine.fetch_platform_feed(PlatformId::TikTok, 10).is_empty());

    match events.try_recv()? {
        Event::PlatformFailed {
            platform,
            operation,
            ..
        } => {
            assert_eq!(platform, PlatformId::TikTok);
            assert_eq!(operation, Operation::Fetch);
        }
        other => panic!("unexpected event {:?}", other),
    }
    Ok(())
}

#[test]
fn test_post_map_has_entry_for_each_requested_platform() -> Result<()> {
    let a = Arc::new(MockAdapter::success(PlatformId::Instagram));
    let c = Arc::new(MockAdapter::rejecting(PlatformId::Mastodon));
    let engine = engine_with(vec![a.clone(), c.clone()])?;

    let media = vec!["/tmp/photo.jpg".to_string()];
    let results = engine.post_to_multiple_platforms(
        "Hello everywhere",
        &media,
        &[PlatformId::Instagram, PlatformId::Bluesky, PlatformId::Mastodon],
    );

    assert_eq!(results.len(), 3);
    assert_eq!(results.get(&PlatformId::Instagram), Some(&true));
    assert_eq!(results.get(&PlatformId::Bluesky), Some(&false));
    assert_eq!(results.get(&PlatformId::Mastodon), Some(&false));

    assert_eq!(a.posted_content(), vec!["Hello everywhere"]);
    assert_eq!(c.post_call_count(), 1);
    Ok(())
}

#[test]
fn test_post_failure_is_recorded_for_that_platform_only() -> Result<()> {
    let engine = engine_with(vec![
        Arc::new(MockAdapter::post_failure(PlatformId::Bluesky, "timeout")),
        Arc::new(MockAdapter::panicking(PlatformId::TikTok)),
        Arc::new(MockAdapter::success(PlatformId::Mastodon)),
    ])?;

    let results = engine.post_to_multiple_platforms(
        "Hi",
        &[],
        &[PlatformId::Bluesky, PlatformId::TikTok, PlatformId::Mastodon],
    );

    assert!(!results[&PlatformId::Bluesky]);
    assert!(!results[&PlatformId::TikTok]);
    assert!(results[&PlatformId::Mastodon]);
    Ok(())
}

#[test]
fn test_interaction_routes_by_post_platform() -> Result<()> {
    let bluesky = Arc::new(MockAdapter::success(PlatformId::Bluesky));
    let mastodon = Arc::new(MockAdapter::success(PlatformId::Mastodon));
    let engine = engine_with(vec![bluesky.clone(), mastodon.clone()])?;

    let post = sample_posts(PlatformId::Mastodon, 1, 1_000, 0).remove(0);
    let mut data = InteractionData::new();
    data.insert("text".to_string(), "Nice post".to_string());

    assert!(engine.perform_social_interaction(&post, "comment", &data));

    assert!(bluesky.interactions().is_empty());
    let recorded = mastodon.interactions();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].platform_post_id, post.platform_post_id);
    assert_eq!(recorded[0].kind, "comment");
    assert_eq!(recorded[0].data, data);
    Ok(())
}

#[test]
fn test_interaction_on_unregistered_platform_is_false() -> Result<()> {
    let bluesky = Arc::new(MockAdapter::success(PlatformId::Bluesky));
    let engine = engine_with(vec![bluesky.clone()])?;

    let post = sample_posts(PlatformId::Instagram, 1, 1_000, 0).remove(0);
    assert!(!engine.perform_social_interaction(&post, "like", &InteractionData::new()));
    assert!(bluesky.interactions().is_empty());
    Ok(())
}

#[test]
fn test_unknown_interaction_kind_is_false() -> Result<()> {
    let engine = engine_with(vec![Arc::new(MockAdapter::success(PlatformId::Bluesky))])?;

    let post = sample_posts(PlatformId::Bluesky, 1, 1_000, 0).remove(0);
    assert!(!engine.perform_social_interaction(&post, "teleport", &InteractionData::new()));
    Ok(())
}

#[test]
fn test_authenticate_failure_modes_collapse_to_false() -> Result<()> {
    let engine = engine_with(vec![
        Arc::new(MockAdapter::success(PlatformId::Bluesky)),
        Arc::new(MockAdapter::rejecting(PlatformId::Mastodon)),
        Arc::new(MockAdapter::auth_failure(PlatformId::Instagram, "reset")),
        Arc::new(MockAdapter::panicking(PlatformId::TikTok)),
    ])?;
    let material = CredentialMaterial::new();

    assert!(engine.authenticate_platform(PlatformId::Bluesky, &material));
    assert!(!engine.authenticate_platform(PlatformId::Mastodon, &material));
    assert!(!engine.authenticate_platform(PlatformId::Instagram, &material));
    assert!(!engine.authenticate_platform(PlatformId::TikTok, &material));
    assert!(!engine.authenticate_platform(PlatformId::YouTube, &material));
    Ok(())
}

#[test]
fn test_registry_changes_between_passes() -> Result<()> {
    let registry = Arc::new(AdapterRegistry::new());
    let engine = AggregationEngine::new(Arc::clone(&registry));

    assert!(engine.fetch_aggregated_feed(5).is_empty());

    registry.register_adapter(Arc::new(MockAdapter::with_posts(
        PlatformId::YouTube,
        sample_posts(PlatformId::YouTube, 2, 1_000, 1),
    )))?;
    assert_eq!(engine.fetch_aggregated_feed(5).len(), 2);

    registry.unregister(PlatformId::YouTube);
    assert!(engine.fetch_aggregated_feed(5).is_empty());
    Ok(())
}
