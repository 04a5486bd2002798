use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const HELLO_STREAM: &str = concat!(
    "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
    "data: [DONE]\n\n",
);

fn serve_stream_once(body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let addr = listener.local_addr().expect("address should be available");
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept should succeed");
        let mut reader = BufReader::new(stream);

        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("header line");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':')
                && name.eq_ignore_ascii_case("content-length")
            {
                content_length = value.trim().parse().expect("content length");
            }
        }

        let mut request_body = vec![0u8; content_length];
        reader
            .read_exact(&mut request_body)
            .expect("request body");

        let mut stream = reader.into_inner();
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{body}"
        )
        .expect("write response");
        stream.flush().expect("flush response");

        String::from_utf8(request_body).expect("request body is utf-8")
    });
    (format!("http://{addr}/v1"), handle)
}

fn ai_command(base_url: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ai"));
    cmd.args(["--api-key", "sk-test", "--base-url", base_url])
        .env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_BASE_URL")
        .env_remove("MODEL")
        .env_remove("SYSTEM_PROMPT")
        .env_remove("RUST_LOG");
    cmd
}

fn run_with_stdin(mut cmd: Command, stdin: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn ai binary");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for ai binary")
}

#[test]
fn missing_api_key_is_a_startup_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_ai"))
        .args(["-s", "hi"])
        .env_remove("OPENAI_API_KEY")
        .output()
        .expect("failed to run ai binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("API key is required"), "{stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn single_message_prints_the_streamed_reply() {
    let (base_url, server) = serve_stream_once(HELLO_STREAM);
    let mut cmd = ai_command(&base_url);
    cmd.args(["-s", "hi", "-p", "answer like a pirate"]);

    let output = cmd.output().expect("failed to run ai binary");
    let request = server.join().expect("server thread should join");

    assert!(
        output.status.success(),
        "stderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Hello world\n");

    let request: serde_json::Value = serde_json::from_str(&request).expect("request is JSON");
    assert_eq!(request["stream"], true);
    assert_eq!(request["model"], "gpt-4o");
    assert_eq!(request["messages"][0]["role"], "system");
    assert_eq!(request["messages"][0]["content"], "answer like a pirate");
    assert_eq!(request["messages"][1]["role"], "user");
    assert_eq!(request["messages"][1]["content"], "hi");
}

#[test]
fn single_message_attaches_piped_input() {
    let (base_url, server) = serve_stream_once(HELLO_STREAM);
    let mut cmd = ai_command(&base_url);
    cmd.args(["-s", "summarize"]);

    let output = run_with_stdin(cmd, "line one\nline two\n");
    let request = server.join().expect("server thread should join");

    assert!(output.status.success());
    let request: serde_json::Value = serde_json::from_str(&request).expect("request is JSON");
    assert_eq!(
        request["messages"][1]["content"],
        "summarize\n\n```\nline one\nline two\n```"
    );
}

#[test]
fn single_message_fails_when_the_stream_is_truncated() {
    let (base_url, server) = serve_stream_once(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
    );
    let mut cmd = ai_command(&base_url);
    cmd.args(["-s", "hi"]);

    let output = cmd.output().expect("failed to run ai binary");
    server.join().expect("server thread should join");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("malformed model response"), "{stderr}");
}

#[test]
fn interactive_mode_reads_lines_until_quit() {
    let (base_url, server) = serve_stream_once(HELLO_STREAM);
    let mut cmd = ai_command(&base_url);
    cmd.args(["-q", "-n"]);

    let output = run_with_stdin(cmd, "hi\n/quit\n");
    let request = server.join().expect("server thread should join");

    assert!(
        output.status.success(),
        "stderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Hello world\n");
    assert!(request.contains("\"content\":\"hi\""), "{request}");
}

#[cfg(unix)]
#[test]
fn ctrl_c_ends_one_shot_while_stdin_pipe_is_open() {
    let mut cmd = ai_command("http://127.0.0.1:9/v1");
    let mut child = cmd
        .args(["-s", "hi"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn ai binary");
    let held_stdin = child.stdin.take().expect("stdin is piped");

    thread::sleep(Duration::from_millis(500));
    let sent = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("failed to run kill");
    assert!(sent.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    let status = loop {
        if let Some(status) = child.try_wait().expect("poll child") {
            break Some(status);
        }
        if Instant::now() >= deadline {
            break None;
        }
        thread::sleep(Duration::from_millis(50));
    };
    if status.is_none() {
        let _ = child.kill();
        let _ = child.wait();
    }
    drop(held_stdin);

    let status = status.expect("SIGINT should end a one-shot run blocked on stdin");
    assert!(!status.success());
}
