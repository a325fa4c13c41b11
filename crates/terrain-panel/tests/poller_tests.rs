//! Polling behavior against a fake fetch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use terrain_panel::*;

#[tokio::test]
async fn test_poller_refreshes_until_destroyed() {
    let view: PanelView<usize> = PanelView::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let poller = Poller::start(view.clone(), Duration::from_millis(10), move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Ok(n) }
    });

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(calls.load(Ordering::SeqCst) >= 3);
    assert!(matches!(view.state().await, PanelState::Ready { .. }));

    view.destroy();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(poller.is_finished());
    let after_destroy = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(calls.load(Ordering::SeqCst), after_destroy);
}

#[tokio::test]
async fn test_last_resolved_fetch_wins() {
    let view: PanelView<&'static str> = PanelView::new();

    let slow = {
        let view = view.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            view.apply(Ok("issued first, resolved last")).await
        })
    };
    let fast = {
        let view = view.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            view.apply(Ok("issued second, resolved first")).await
        })
    };
    assert!(fast.await.unwrap());
    assert!(slow.await.unwrap());

    match view.state().await {
        PanelState::Ready { data, .. } => assert_eq!(data, "issued first, resolved last"),
        other => panic!("unexpected state {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_error_surfaces_without_retry() {
    let view: PanelView<u32> = PanelView::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let poller = Poller::start(view.clone(), Duration::from_secs(3600), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err(PanelError::Fetch("connection refused".into())) }
    });

    tokio::time::sleep(Duration::from_millis(30)).await;
    poller.stop();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        view.state().await,
        PanelState::Error("Fetch failed: connection refused".into())
    );
}
