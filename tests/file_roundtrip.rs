use coopio::fs::{BufferMode, File};
use coopio::{Error, Runtime};
use std::io::SeekFrom;
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

#[test]
fn write_close_open_read_roundtrip() {
    let mut rt = Runtime::new();
    let path = temp_path("roundtrip");

    rt.block_on(async {
        let writer = File::open(&path, "w").await.unwrap();
        writer.write(b"hello world").await.unwrap();
        writer.close().await.unwrap();

        let reader = File::open(&path, "r").await.unwrap();
        let content = reader.read_all().await.unwrap().unwrap();
        assert_eq!(content, b"hello world");

        reader.close().await.unwrap();
    });

    let _ = std::fs::remove_file(path);
}

#[test]
fn seek_rewinds_past_buffered_lookahead() {
    let mut rt = Runtime::new();
    let path = temp_path("seek");

    rt.block_on(async {
        let writer = File::open(&path, "w").await.unwrap();
        writer.write(b"abcdef").await.unwrap();
        writer.close().await.unwrap();

        let file = File::open(&path, "r").await.unwrap();

        let head = file.read_bytes(3).await.unwrap().unwrap();
        assert_eq!(head, b"abc");

        // The handle position accounts for lookahead the fill pulled in.
        let pos = file.seek(SeekFrom::Current(0)).await.unwrap();
        assert_eq!(pos, 3);

        let pos = file.seek(SeekFrom::Start(0)).await.unwrap();
        assert_eq!(pos, 0);

        let all = file.read_all().await.unwrap().unwrap();
        assert_eq!(all, b"abcdef", "a rewound handle reads the whole file");

        file.close().await.unwrap();
    });

    let _ = std::fs::remove_file(path);
}

#[test]
fn close_is_idempotent_and_final() {
    let mut rt = Runtime::new();
    let path = temp_path("close");

    rt.block_on(async {
        let file = File::open(&path, "w").await.unwrap();

        file.close().await.unwrap();
        file.close().await.unwrap();

        assert_eq!(file.as_raw_fd(), -1, "a closed handle re-tags its fd");

        let err = file.read_line().await.unwrap_err();
        assert!(err.is_closed());

        let err = file.write(b"late").await.unwrap_err();
        assert!(err.is_closed());

        let err = file.seek(SeekFrom::Start(0)).await.unwrap_err();
        assert!(err.is_closed());
    });

    let _ = std::fs::remove_file(path);
}

#[test]
fn open_failure_reports_path() {
    let mut rt = Runtime::new();

    let err = rt
        .block_on(File::open("/definitely/not/here/coopio.tmp", "r"))
        .unwrap_err();

    let message = err.to_string();
    assert!(
        message.starts_with("/definitely/not/here/coopio.tmp: "),
        "open errors should be prefixed with the path: {message}"
    );
    assert!(matches!(err, Error::Open { .. }));
}

#[test]
fn open_close_cycles_do_not_leak_descriptors() {
    let mut rt = Runtime::new();
    let path = temp_path("leak");

    std::fs::write(&path, "x").unwrap();

    rt.block_on(async {
        let mut first_fd = None;

        for _ in 0..10_000 {
            let file = File::open(&path, "r").await.unwrap();
            let fd = file.as_raw_fd();

            let bound = *first_fd.get_or_insert(fd);
            assert!(
                fd <= bound + 4,
                "descriptor numbers should not grow across open/close cycles"
            );

            file.close().await.unwrap();
        }
    });

    let _ = std::fs::remove_file(path);
}

#[test]
fn full_buffering_defers_writes() {
    let mut rt = Runtime::new();
    let path = temp_path("setvbuf-full");

    rt.block_on(async {
        let file = File::open(&path, "w").await.unwrap();
        file.setvbuf(BufferMode::Full, Some(64)).await.unwrap();

        file.write(b"abc").await.unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);

        file.flush().await.unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 3);

        file.close().await.unwrap();
    });

    let _ = std::fs::remove_file(path);
}

#[test]
fn line_buffering_flushes_complete_lines() {
    let mut rt = Runtime::new();
    let path = temp_path("setvbuf-line");

    rt.block_on(async {
        let file = File::open(&path, "w").await.unwrap();
        file.setvbuf(BufferMode::Line, None).await.unwrap();

        file.write(b"ab").await.unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);

        file.write(b"c\nd").await.unwrap();
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            4,
            "everything through the newline should be flushed"
        );

        // Close drains the partial tail.
        file.close().await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abc\nd");
    });

    let _ = std::fs::remove_file(path);
}
