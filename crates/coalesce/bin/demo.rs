use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use coalesce::Coordinator;

/// Pretends to be a backend batch-lookup call: one invocation per batch,
/// regardless of how many distinct ids were asked for.
fn lookup(ids: Vec<u64>) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
    eprintln!("callback invoked for {} unique id(s): {ids:?}", ids.len());
    Ok(ids.into_iter().map(|id| format!("user-{id}")).collect())
}

fn main() {
    tracing_subscriber_init();

    let invocations = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&invocations);
    let coordinator = Coordinator::create(Duration::from_millis(50), 16, move |ids| {
        counted.fetch_add(1, Ordering::SeqCst);
        lookup(ids)
    });

    let mut handles = Vec::new();
    for id in [1u64, 2, 1, 3, 2, 4] {
        let coordinator = Arc::clone(&coordinator);
        handles.push(thread::spawn(move || {
            let name = coordinator.execute(id).expect("callback should not fail");
            println!("id {id} resolved to {name}");
        }));
    }
    for handle in handles {
        handle.join().expect("submitter thread panicked");
    }

    println!("callback ran {} time(s) for 6 submissions across 4 distinct ids", invocations.load(Ordering::SeqCst));
}

fn tracing_subscriber_init() {
    // A demo binary's own logging is best-effort; a failed init just means
    // no tracing output, not a broken demo.
    let _ = tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::INFO)
            .finish(),
    );
}
