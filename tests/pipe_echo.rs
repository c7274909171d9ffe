use coopio::fs::File;
use coopio::{Runtime, Task, sleep};
use std::os::unix::io::FromRawFd;
use std::time::Duration;

fn pipe() -> (i32, i32) {
    let mut fds = [0i32; 2];
    let res = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(res, 0, "pipe() failed");

    (fds[0], fds[1])
}

#[test]
fn echo_between_pipes() {
    let mut rt = Runtime::new();

    let (read_a, write_a) = pipe();
    let (read_b, write_b) = pipe();

    rt.block_on(async move {
        let echo = Task::spawn(async move {
            let input = unsafe { File::from_raw_fd(read_a) };
            let output = unsafe { File::from_raw_fd(write_b) };

            let line = input.read_line().await.unwrap().unwrap();
            output.write(line.as_bytes()).await.unwrap();

            output.close().await.unwrap();
            input.close().await.unwrap();
        });

        let feeder = unsafe { File::from_raw_fd(write_a) };
        feeder.write(b"hello\n").await.unwrap();
        feeder.close().await.unwrap();

        let sink = unsafe { File::from_raw_fd(read_b) };
        let echoed = sink.read_all().await.unwrap().unwrap();
        assert_eq!(echoed, b"hello");

        echo.await;
        sink.close().await.unwrap();
    });
}

#[test]
fn close_refuses_while_tasks_are_parked() {
    let mut rt = Runtime::new();

    let (read_fd, write_fd) = pipe();

    rt.block_on(async move {
        let file = unsafe { File::from_raw_fd(read_fd) };

        let reader_file = file.clone();
        let reader = Task::spawn(async move {
            let bytes = reader_file.read_bytes(1).await.unwrap().unwrap();
            assert_eq!(bytes, b"x");
        });

        // Let the reader park on the empty pipe.
        sleep(Duration::from_millis(10)).await;

        let err = file.close().await.unwrap_err();
        assert!(
            matches!(err, coopio::Error::Parked(_)),
            "closing under a parked reader should be refused"
        );

        // Unblock the reader; afterwards the close goes through.
        let wrote = unsafe { libc::write(write_fd, b"x".as_ptr() as *const _, 1) };
        assert_eq!(wrote, 1);

        reader.await;
        file.close().await.unwrap();

        unsafe {
            libc::close(write_fd);
        }
    });
}

#[test]
fn reader_retries_after_would_block() {
    let mut rt = Runtime::new();

    let (read_fd, write_fd) = pipe();

    rt.block_on(async move {
        let reader = Task::spawn(async move {
            let file = unsafe { File::from_raw_fd(read_fd) };

            // The pipe is empty: the first read attempt parks the task.
            let bytes = file.read_bytes(1).await.unwrap().unwrap();
            assert_eq!(bytes, b"x");

            file.close().await.unwrap();
        });

        // Let the reader park, then make the descriptor ready.
        sleep(Duration::from_millis(10)).await;

        let wrote = unsafe { libc::write(write_fd, b"x".as_ptr() as *const _, 1) };
        assert_eq!(wrote, 1);

        reader.await;

        unsafe {
            libc::close(write_fd);
        }
    });
}
