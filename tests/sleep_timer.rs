use coopio::{Runtime, Task, sleep};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[test]
fn sleep_waits_at_least_duration() {
    let mut rt = Runtime::new();

    let start = Instant::now();
    rt.block_on(async {
        sleep(Duration::from_millis(50)).await;
    });
    let elapsed = start.elapsed();

    assert!(
        elapsed >= Duration::from_millis(50),
        "sleep should wait at least the specified duration"
    );
}

#[test]
fn zero_duration_sleep_is_immediate() {
    let mut rt = Runtime::new();

    let start = Instant::now();
    rt.block_on(async {
        sleep(Duration::from_millis(0)).await;
    });
    let elapsed = start.elapsed();

    assert!(
        elapsed < Duration::from_millis(10),
        "zero duration sleep should be fast"
    );
}

#[test]
fn concurrent_timers_resume_their_own_tasks() {
    let mut rt = Runtime::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let slow_order = order.clone();
    let fast_order = order.clone();

    rt.block_on(async move {
        // Spawn the long sleeper first so its timer is armed first; the
        // short sleeper must still resume first.
        let slow = Task::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            slow_order.lock().unwrap().push(100u64);
        });

        let fast = Task::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            fast_order.lock().unwrap().push(10u64);
        });

        slow.await;
        fast.await;
    });

    assert_eq!(
        *order.lock().unwrap(),
        vec![10, 100],
        "timers should resume the task that armed them"
    );
}

#[test]
fn sleep_in_helper_function() {
    let mut rt = Runtime::new();
    let start = Instant::now();

    rt.block_on(async {
        sleep_and_check(start).await;
    });
}

async fn sleep_and_check(start: Instant) {
    let before = start.elapsed();
    sleep(Duration::from_millis(30)).await;
    let after = start.elapsed();

    assert!(after - before >= Duration::from_millis(30));
}
