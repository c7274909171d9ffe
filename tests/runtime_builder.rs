use coopio::fs::File;
use coopio::{Runtime, RuntimeBuilder, sleep};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn temp_path(tag: &str) -> String {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock drift")
        .as_nanos();

    std::env::temp_dir()
        .join(format!("coopio-{tag}-{}-{unique}.tmp", std::process::id()))
        .to_string_lossy()
        .into_owned()
}

#[test]
fn builder_with_fs_runs_file_operations() {
    let mut rt = RuntimeBuilder::new().enable_fs().build();
    let path = temp_path("builder");

    rt.block_on(async {
        let file = File::open(&path, "w").await.unwrap();
        file.write(b"built").await.unwrap();
        file.close().await.unwrap();

        let file = File::open(&path, "r").await.unwrap();
        assert_eq!(file.read_all().await.unwrap().unwrap(), b"built");
        file.close().await.unwrap();
    });

    let _ = std::fs::remove_file(path);
}

#[test]
fn small_event_capacity_still_delivers() {
    // A one-event pump batch: readiness just arrives over more cycles.
    let mut rt = RuntimeBuilder::new().enable_fs().event_capacity(1).build();
    let path = temp_path("capacity");

    rt.block_on(async {
        let file = File::open(&path, "w").await.unwrap();
        file.write(b"tiny batches").await.unwrap();
        file.close().await.unwrap();

        let file = File::open(&path, "r").await.unwrap();
        assert_eq!(file.read_all().await.unwrap().unwrap(), b"tiny batches");
        file.close().await.unwrap();
    });

    let _ = std::fs::remove_file(path);
}

#[test]
fn default_runtime_enables_everything() {
    let mut rt = Runtime::new();

    rt.block_on(async {
        sleep(Duration::from_millis(1)).await;
    });
}

#[test]
#[should_panic(expected = "I/O support not enabled")]
fn io_apis_require_io_feature() {
    let mut rt = RuntimeBuilder::new().build();

    rt.block_on(async {
        sleep(Duration::from_millis(1)).await;
    });
}

#[test]
#[should_panic(expected = "filesystem support not enabled")]
fn file_apis_require_fs_feature() {
    let mut rt = RuntimeBuilder::new().enable_io().build();

    rt.block_on(async {
        let _ = File::open("/dev/null", "r").await;
    });
}
