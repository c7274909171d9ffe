use coopio::fs::File;
use coopio::time::TimeError;
use coopio::{Runtime, Task, readable, sleep, timeout};
use std::os::unix::io::FromRawFd;
use std::time::{Duration, Instant};

fn nonblocking_pipe() -> (i32, i32) {
    let mut fds = [0i32; 2];
    let res = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(res, 0, "pipe() failed");

    for fd in fds {
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
    }

    (fds[0], fds[1])
}

#[test]
fn timed_yield_resumes_with_would_block() {
    let mut rt = Runtime::new();

    let (read_fd, write_fd) = nonblocking_pipe();

    rt.block_on(async move {
        let start = Instant::now();
        readable(read_fd, Some(Duration::from_millis(30))).await;

        assert!(
            start.elapsed() >= Duration::from_millis(30),
            "a timed yield on a silent descriptor should wait out the deadline"
        );

        // Nothing arrived: the retried syscall reports would-block, which is
        // how the caller tells a timeout from readiness.
        let mut buf = [0u8; 1];
        let n = unsafe { libc::read(read_fd, buf.as_mut_ptr() as *mut _, 1) };
        assert_eq!(n, -1);
        assert_eq!(
            std::io::Error::last_os_error().raw_os_error(),
            Some(libc::EAGAIN)
        );

        unsafe {
            libc::close(read_fd);
            libc::close(write_fd);
        }
    });
}

#[test]
fn timeout_completes_before_deadline() {
    let mut rt = Runtime::new();

    let result = rt.block_on(async {
        let handle = Task::spawn(async {
            sleep(Duration::from_millis(10)).await;
            123
        });

        timeout(Duration::from_millis(100), handle).await
    });

    assert!(
        matches!(result, Ok(123)),
        "timeout should pass the inner result through"
    );
}

#[test]
fn timeout_expires() {
    let mut rt = Runtime::new();

    let result = rt.block_on(async { timeout(Duration::from_millis(20), sleep(Duration::from_millis(200))).await });

    assert_eq!(result, Err(TimeError::Elapsed));
}

#[test]
fn abandoned_read_watch_is_harmless() {
    let mut rt = Runtime::new();

    let (read_fd, write_fd) = nonblocking_pipe();

    rt.block_on(async move {
        let file = unsafe { File::from_raw_fd(read_fd) };

        // The read parks on the empty pipe and is abandoned by the timeout.
        let result = timeout(Duration::from_millis(20), file.read_bytes(1)).await;
        assert!(result.is_err());

        // Fire the stale watch; the resulting resumption must be a no-op.
        let wrote = unsafe { libc::write(write_fd, b"x".as_ptr() as *const _, 1) };
        assert_eq!(wrote, 1);

        sleep(Duration::from_millis(30)).await;

        // The byte is still there for a fresh read.
        let bytes = file.read_bytes(1).await.unwrap().unwrap();
        assert_eq!(bytes, b"x");

        file.close().await.unwrap();

        unsafe {
            libc::close(write_fd);
        }
    });
}
