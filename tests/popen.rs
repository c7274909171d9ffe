use coopio::Runtime;
use coopio::fs::File;
use std::time::{SystemTime, UNIX_EPOCH};

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
fn popen_reads_child_output() {
    let mut rt = Runtime::new();

    rt.block_on(async {
        let pipe = File::popen("echo hello", "r").await.unwrap();

        let line = pipe.read_line().await.unwrap();
        assert_eq!(line.as_deref(), Some("hello"));

        assert_eq!(pipe.read_line().await.unwrap(), None);

        pipe.close().await.unwrap();
    });
}

#[test]
fn popen_writes_child_input() {
    let mut rt = Runtime::new();
    let path = temp_path("popen-write");

    rt.block_on(async {
        let pipe = File::popen(&format!("cat > {path}"), "w").await.unwrap();

        pipe.write(b"piped\n").await.unwrap();

        // Close delivers EOF to the child and reaps it.
        pipe.close().await.unwrap();
    });

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "piped\n");

    let _ = std::fs::remove_file(path);
}

#[test]
#[should_panic(expected = "invalid popen mode")]
fn popen_rejects_unknown_mode() {
    let mut rt = Runtime::new();

    let _ = rt.block_on(File::popen("true", "x"));
}
