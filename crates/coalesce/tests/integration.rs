use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use coalesce::{CoalesceError, Coordinator};

fn double(args: Vec<i32>) -> Result<Vec<i32>, Box<dyn Error + Send + Sync>> {
    Ok(args.into_iter().map(|a| a * 2).collect())
}

#[test]
fn batch_closes_by_size_before_the_window_elapses() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&invocations);
    let coordinator = Coordinator::create(Duration::from_secs(30), 4, move |args: Vec<i32>| {
        counted.fetch_add(1, Ordering::SeqCst);
        double(args)
    });

    let start = std::time::Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || coordinator.execute(i))
        })
        .collect();
    let results: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();

    assert!(start.elapsed() < Duration::from_secs(5), "size-closed batch should not wait out the window");
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    let mut results = results;
    results.sort_unstable();
    assert_eq!(results, vec![0, 2, 4, 6]);
}

#[test]
fn batch_closes_by_window_when_under_max_size() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&invocations);
    let coordinator = Coordinator::create(Duration::from_millis(80), 100, move |args: Vec<i32>| {
        counted.fetch_add(1, Ordering::SeqCst);
        double(args)
    });

    let handle = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.execute(21))
    };
    assert_eq!(handle.join().unwrap().unwrap(), 42);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[test]
fn duplicate_arguments_collapse_into_one_callback_entry() {
    let seen_unique_count = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&seen_unique_count);
    let coordinator = Coordinator::create(Duration::from_millis(100), 16, move |args: Vec<i32>| {
        counted.store(args.len(), Ordering::SeqCst);
        double(args)
    });

    let handles: Vec<_> = [7, 7, 7, 9, 9]
        .into_iter()
        .map(|arg| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || coordinator.execute(arg))
        })
        .collect();
    let results: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();

    assert_eq!(seen_unique_count.load(Ordering::SeqCst), 2);
    let mut results = results;
    results.sort_unstable();
    assert_eq!(results, vec![14, 14, 14, 18, 18]);
}

#[test]
fn callback_failure_propagates_to_every_member_of_the_batch() {
    let coordinator = Coordinator::create(Duration::from_millis(50), 8, |_args: Vec<i32>| {
        Err("upstream unavailable".into())
    });

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || coordinator.execute(i))
        })
        .collect();

    for handle in handles {
        assert!(matches!(
            handle.join().unwrap(),
            Err(CoalesceError::CallbackFailed(_))
        ));
    }
}

#[test]
fn arity_mismatch_is_reported_to_every_member() {
    let coordinator = Coordinator::create(Duration::from_millis(50), 8, |_args: Vec<i32>| Ok(vec![1, 2]));

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || coordinator.execute(i))
        })
        .collect();

    for handle in handles {
        assert!(matches!(
            handle.join().unwrap(),
            Err(CoalesceError::ArityMismatch { expected: 3, actual: 2 })
        ));
    }
}

#[test]
fn deferred_handle_supports_poll_wait_and_cancel() {
    let coordinator = Coordinator::create(Duration::from_millis(40), 8, double);

    let pending = coordinator.execute_as_future(5);
    assert!(!pending.is_done());
    assert_eq!(pending.get().unwrap(), 10);
    assert!(pending.is_done());

    let cancelled = coordinator.execute_as_future(6);
    cancelled.cancel();
    assert!(matches!(cancelled.get(), Err(CoalesceError::Cancelled)));
}

#[test]
fn deferred_get_timeout_does_not_disturb_the_underlying_submission() {
    let coordinator = Coordinator::create(Duration::from_millis(300), 8, double);
    let handle = coordinator.execute_as_future(3);

    assert!(matches!(
        handle.get_timeout(Duration::from_millis(10)),
        Err(CoalesceError::Timeout)
    ));
    assert_eq!(handle.get().unwrap(), 6);
}

#[tokio::test]
async fn mono_is_cold_and_independently_resubscribable() {
    let coordinator = Coordinator::create(Duration::from_millis(40), 8, double);

    let mono = coordinator.execute_as_mono(11);
    let first = mono.subscribe().await.unwrap();
    let second = mono.subscribe().await.unwrap();

    assert_eq!(first, 22);
    assert_eq!(second, 22);
}

#[tokio::test]
async fn mono_subscriptions_batch_together_like_any_other_modality() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&invocations);
    let coordinator = Coordinator::create(Duration::from_millis(80), 100, move |args: Vec<i32>| {
        counted.fetch_add(1, Ordering::SeqCst);
        double(args)
    });

    let a = coordinator.execute_as_mono(1);
    let b = coordinator.execute_as_mono(2);
    let (ra, rb) = tokio::join!(a.subscribe(), b.subscribe());

    assert_eq!(ra.unwrap(), 2);
    assert_eq!(rb.unwrap(), 4);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[test]
fn backpressure_blocks_producers_without_losing_submissions() {
    let coordinator = {
        let worker_pool = Arc::new(coalesce::FixedThreadPool::new(2));
        let config = coalesce::CoordinatorConfig::new(
            Duration::from_millis(20),
            4,
            4,
            false,
            Arc::new(|args: Vec<i32>| double(args)),
            worker_pool,
        );
        Coordinator::with_config(config)
    };

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || coordinator.execute(i))
        })
        .collect();

    let mut results: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
    results.sort_unstable();
    assert_eq!(results, (0..20).map(|i| i * 2).collect::<Vec<_>>());
}

#[test]
fn live_buffer_capacity_change_preserves_in_flight_submissions() {
    let coordinator = Coordinator::create(Duration::from_millis(200), 32, double);

    let handle = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.execute(15))
    };
    thread::sleep(Duration::from_millis(5));

    let worker_pool = Arc::new(coalesce::FixedThreadPool::new(4));
    let new_config = coalesce::CoordinatorConfig::new(
        Duration::from_millis(200),
        4,
        4,
        true,
        Arc::new(|args: Vec<i32>| double(args)),
        worker_pool,
    );
    coordinator.update_config(new_config);

    assert_eq!(handle.join().unwrap().unwrap(), 30);
}
