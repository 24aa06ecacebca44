use formguard::rate_limit::RateLimiter;
use std::sync::Arc;
use std::time::Duration;

const WINDOW: i64 = 3600;
const MAX: u32 = 3;
const T0: i64 = 1_700_000_000;

fn limiter() -> RateLimiter {
    RateLimiter::new(WINDOW, MAX)
}

#[test]
fn first_submission_is_allowed() {
    let limiter = limiter();
    assert!(limiter.check_at("198.51.100.1", T0));
}

#[test]
fn allows_up_to_quota_then_denies() {
    let limiter = limiter();
    for i in 0..3 {
        assert!(limiter.check_at("198.51.100.1", T0 + i), "submission {}", i);
    }
    assert!(!limiter.check_at("198.51.100.1", T0 + 10));
}

#[test]
fn denial_does_not_extend_the_window() {
    let limiter = limiter();
    for i in 0..3 {
        assert!(limiter.check_at("198.51.100.1", T0 + i));
    }
    // Hammering while denied must not push the window forward.
    assert!(!limiter.check_at("198.51.100.1", T0 + 1800));
    assert!(!limiter.check_at("198.51.100.1", T0 + WINDOW));
    assert!(limiter.check_at("198.51.100.1", T0 + WINDOW + 1));
}

#[test]
fn window_expiry_resets_the_counter() {
    let limiter = limiter();
    for i in 0..3 {
        assert!(limiter.check_at("198.51.100.1", T0 + i));
    }
    assert!(!limiter.check_at("198.51.100.1", T0 + 4));

    // New window: the reset counter starts at 1, so two more fit.
    let t1 = T0 + WINDOW + 1;
    assert!(limiter.check_at("198.51.100.1", t1));
    assert!(limiter.check_at("198.51.100.1", t1 + 1));
    assert!(limiter.check_at("198.51.100.1", t1 + 2));
    assert!(!limiter.check_at("198.51.100.1", t1 + 3));
}

#[test]
fn clients_have_independent_quotas() {
    let limiter = limiter();
    for i in 0..3 {
        assert!(limiter.check_at("198.51.100.1", T0 + i));
    }
    assert!(!limiter.check_at("198.51.100.1", T0 + 10));
    assert!(limiter.check_at("203.0.113.9", T0 + 10));
}

#[test]
fn sweep_removes_only_expired_windows() {
    let limiter = limiter();
    assert!(limiter.check_at("stale-client", T0));
    assert!(limiter.check_at("fresh-client", T0 + WINDOW));
    assert_eq!(limiter.tracked_clients(), 2);

    let removed = limiter.sweep_at(T0 + WINDOW + 1);
    assert_eq!(removed, 1);
    assert_eq!(limiter.tracked_clients(), 1);

    // The swept client starts over as if never seen.
    assert!(limiter.check_at("stale-client", T0 + WINDOW + 2));
}

#[test]
fn sweep_on_empty_map_is_a_noop() {
    let limiter = limiter();
    assert_eq!(limiter.sweep_at(T0), 0);
}

#[tokio::test]
async fn sweeper_task_evicts_in_background() {
    let limiter = Arc::new(RateLimiter::new(WINDOW, MAX));
    let expired = chrono::Utc::now().timestamp() - WINDOW - 60;
    assert!(limiter.check_at("stale-client", expired));
    assert_eq!(limiter.tracked_clients(), 1);

    let sweeper = limiter.start_sweeper(Duration::from_millis(50));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while limiter.tracked_clients() > 0 {
        if tokio::time::Instant::now() >= deadline {
            panic!("sweeper never evicted the expired window");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    sweeper.shutdown();
}
