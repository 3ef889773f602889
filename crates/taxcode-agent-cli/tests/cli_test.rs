//! Integration tests for the taxcode CLI.
//!
//! Network-facing commands are tested against a one-shot HTTP stub that
//! impersonates the Ollama chat endpoint on a local listener.

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_taxcode"))
}

/// Serve exactly one Ollama-style chat response, returning the endpoint URL
/// and the join handle.
fn serve_chat_once(answer: &str) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
    let addr = listener.local_addr().expect("stub listener addr");
    let body = serde_json_body(answer);

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept stub connection");
        read_http_request(&mut stream);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).expect("write stub response");
    });

    (format!("http://{addr}"), handle)
}

fn serde_json_body(answer: &str) -> String {
    // Escape enough for the plain answers used in these tests.
    let escaped = answer.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
    format!(r#"{{"model":"test-model","message":{{"role":"assistant","content":"{escaped}"}},"done":true}}"#)
}

/// Read one HTTP request (headers plus content-length body) off the stream.
fn read_http_request(stream: &mut std::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let n = stream.read(&mut chunk).expect("read stub request");
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(header_end) = find_header_end(&buf) {
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return;
            }
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

const SECTION_XML: &str = r#"<uscDoc xmlns="http://xml.house.gov/schemas/uslm/1.0">
  <title>
    <num>Title 26</num>
    <heading>Internal Revenue Code</heading>
  </title>
  <main>
    <section>
      <num>§63</num>
      <heading>Taxable Income Defined</heading>
      <paragraph>
        <num>(1)</num>
        <content>In general, see</content>
        <ref href="https://uscode.example/63">section 63</ref>
      </paragraph>
      <table>
        <thead><tr><th>Status</th><th>Amount</th></tr></thead>
        <tbody><tr><td>Joint</td><td>$5,000</td></tr></tbody>
      </table>
    </section>
  </main>
</uscDoc>"#;

const TAX_CODE_MD: &str = "## §63 Taxable Income Defined\n\n\
    The standard deduction means the basic standard deduction.\n";

#[test]
fn convert_writes_markdown_artifact() {
    let temp = TempDir::new().unwrap();
    let xml = temp.path().join("usc26.xml");
    let output = temp.path().join("usc26.md");
    fs::write(&xml, SECTION_XML).unwrap();

    cli()
        .arg("convert")
        .arg("--xml")
        .arg(&xml)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let markdown = fs::read_to_string(&output).unwrap();
    assert!(markdown.contains("# Title 26"));
    assert!(markdown.contains("## §63 Taxable Income Defined"));
    assert!(markdown.contains("[section 63](https://uscode.example/63)"));
    assert!(markdown.contains("| Status | Amount |"));
    assert!(markdown.contains("| Joint | $5,000 |"));
}

#[test]
fn convert_missing_input_fails_with_diagnostic() {
    let temp = TempDir::new().unwrap();

    cli()
        .arg("convert")
        .arg("--xml")
        .arg(temp.path().join("absent.xml"))
        .arg("--output")
        .arg(temp.path().join("out.md"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn ask_answers_via_model_endpoint() {
    let temp = TempDir::new().unwrap();
    let tax_code = temp.path().join("formatted.md");
    fs::write(&tax_code, TAX_CODE_MD).unwrap();

    let answer = "The basic standard deduction applies.\n\nSource: 26 USC §63 [Taxable Income Defined]";
    let (host, handle) = serve_chat_once(answer);

    cli()
        .arg("ask")
        .arg("What is the standard deduction?")
        .arg("--tax-code")
        .arg(&tax_code)
        .env("OLLAMA_HOST", &host)
        .assert()
        .success()
        .stdout(predicate::str::contains("basic standard deduction applies"));

    handle.join().unwrap();
}

#[test]
fn ask_appends_fallback_citation() {
    let temp = TempDir::new().unwrap();
    let tax_code = temp.path().join("formatted.md");
    fs::write(&tax_code, TAX_CODE_MD).unwrap();

    // Answer without a citation marker: the agent appends one itself.
    let (host, handle) = serve_chat_once("The basic standard deduction applies.");

    cli()
        .arg("ask")
        .arg("What is the standard deduction?")
        .arg("--tax-code")
        .arg(&tax_code)
        .env("OLLAMA_HOST", &host)
        .assert()
        .success()
        .stdout(predicate::str::contains("Source: 26 USC §63 [Taxable Income Defined]"));

    handle.join().unwrap();
}

#[test]
fn ask_without_matches_apologizes_offline() {
    let temp = TempDir::new().unwrap();
    let tax_code = temp.path().join("formatted.md");
    fs::write(&tax_code, TAX_CODE_MD).unwrap();

    cli()
        .arg("ask")
        .arg("zzzzz qqqqq")
        .arg("--tax-code")
        .arg(&tax_code)
        // Closed port: the command must not reach the network at all.
        .env("OLLAMA_HOST", "http://127.0.0.1:9")
        .assert()
        .success()
        .stdout(predicate::str::contains("couldn't find specific information"));
}

#[test]
fn format_resume_reuses_completed_chunks() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("input.md");
    let output = temp.path().join("formatted.md");
    fs::write(&input, "single paragraph").unwrap();
    // The one chunk is already formatted; resume must not call the model.
    let intermediate = temp.path().join("data/output");
    fs::create_dir_all(&intermediate).unwrap();
    fs::write(intermediate.join("formatted_0.md"), "already formatted").unwrap();

    cli()
        .current_dir(temp.path())
        .arg("format")
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--resume")
        .env("OLLAMA_HOST", "http://127.0.0.1:9")
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&output).unwrap(), "already formatted");
}

#[test]
fn chat_exits_on_exit_command() {
    let temp = TempDir::new().unwrap();
    let tax_code = temp.path().join("formatted.md");
    fs::write(&tax_code, TAX_CODE_MD).unwrap();

    cli()
        .arg("chat")
        .arg("--tax-code")
        .arg(&tax_code)
        .env("OLLAMA_HOST", "http://127.0.0.1:9")
        .write_stdin("exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome to Tax Agent"))
        .stdout(predicate::str::contains("Goodbye!"));
}
