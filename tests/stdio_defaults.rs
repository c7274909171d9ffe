use coopio::{Runtime, fs};
use std::os::unix::io::AsRawFd;
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

// One test only: the default streams are process-wide state shared by every
// test in this binary.
#[test]
fn default_streams_redirect() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut rt = Runtime::new();

    let in_path = temp_path("stdin");
    let out_path = temp_path("stdout");

    std::fs::write(&in_path, "first\nsecond\n").unwrap();

    rt.block_on(async {
        // Before any redirection, the default input is stdin itself.
        assert_eq!(fs::stdin().as_raw_fd(), libc::STDIN_FILENO);

        fs::open_input(&in_path).await.unwrap();
        fs::open_output(&out_path).await.unwrap();

        let line = fs::read_line().await.unwrap().unwrap();
        assert_eq!(line, "first");

        fs::write(line.as_bytes()).await.unwrap();
        fs::flush().await.unwrap();

        let mut lines = fs::lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    });

    assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "first");

    let _ = std::fs::remove_file(in_path);
    let _ = std::fs::remove_file(out_path);
}
