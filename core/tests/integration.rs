//! Full URL, file and demo lifecycles against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every `ApiClient`
//! operation over real HTTP through `UreqTransport`.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use sshcx_core::{ApiClient, ApiError, ClientConfig, Reply, UreqTransport};
use tracing_subscriber::fmt::MakeWriter;

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

/// Answers a single request with `status` and the raw `body` bytes.
fn serve_once(status: &'static str, body: &'static [u8]) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(body).unwrap();
    });

    addr
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn client(addr: SocketAddr, token: &str) -> ApiClient {
    let config = ClientConfig::default().with_base_url(&format!("http://{addr}/v1"));
    ApiClient::with_config(token, &config)
}

#[test]
fn url_lifecycle() {
    let addr = start_server();
    let api = client(addr, mock_server::DEFAULT_TOKEN);

    // Step 1: list, should be empty.
    assert!(api.list_urls().unwrap().into_vec().is_empty());

    // Step 2: shorten two links.
    let first = api.create_short_url("http://google.com").unwrap().one().unwrap();
    let second = api.create_short_url("http://example.com").unwrap().one().unwrap();
    assert_eq!(first.url.as_deref(), Some("http://google.com"));
    let first_id = first.id.unwrap();
    let first_short = first.short.clone().unwrap();

    // Step 3: the link field round-trips through the short-code helper.
    let link = first.extra["link"].as_str().unwrap();
    assert_eq!(ApiClient::<sshcx_core::UreqTransport>::short_code_from_url(link), first_short);

    // Step 4: get by id and by short code.
    let by_id = api.get_url_by_id(first_id).unwrap().one().unwrap();
    let by_short = api.get_url_by_short(&first_short).unwrap().one().unwrap();
    assert_eq!(by_id, first);
    assert_eq!(by_short, first);

    // Step 5: list, should have two.
    assert_eq!(api.list_urls().unwrap().into_vec().len(), 2);

    // Step 6: delete by short, then a second delete is a remote 404.
    api.delete_url_by_short(&first_short).unwrap();
    let err = api.delete_url_by_short(&first_short).unwrap_err();
    assert!(matches!(err, ApiError::Remote { status: 404, .. }));

    // Step 7: delete by id.
    let removed = api.delete_url_by_id(second.id.unwrap()).unwrap().one().unwrap();
    assert_eq!(removed.url.as_deref(), Some("http://example.com"));

    // Step 8: delete all answers with an empty body.
    api.create_short_url("http://third.example").unwrap();
    assert_eq!(api.delete_all_urls().unwrap(), Reply::NoContent);
    assert!(api.list_urls().unwrap().into_vec().is_empty());
}

#[test]
fn file_lifecycle() {
    let addr = start_server();
    let api = client(addr, mock_server::DEFAULT_TOKEN);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("filename.zip");
    std::fs::write(&path, b"PK\x03\x04zip-bytes").unwrap();

    let uploaded = api.upload_file(&path).unwrap().one().unwrap();
    assert_eq!(uploaded.name.as_deref(), Some("filename.zip"));
    assert_eq!(uploaded.mime.as_deref(), Some("application/zip"));
    assert_eq!(uploaded.size, Some(13));

    let files = api.list_files().unwrap().into_vec();
    assert_eq!(files, vec![uploaded.clone()]);

    let id = uploaded.id.unwrap();
    let short = uploaded.short.clone().unwrap();
    assert_eq!(api.get_file_by_id(id).unwrap().one().unwrap(), uploaded);
    assert_eq!(api.get_file_by_short(&short).unwrap().one().unwrap(), uploaded);

    api.delete_file_by_id(id).unwrap();
    assert!(matches!(
        api.get_file_by_short(&short),
        Err(ApiError::Remote { status: 404, .. })
    ));

    api.upload_file(&path).unwrap();
    api.delete_file_by_short(&api.list_files().unwrap().into_vec()[0].short.clone().unwrap())
        .unwrap();
    api.upload_file(&path).unwrap();
    assert!(api.delete_all_files().unwrap().is_no_content());
    assert!(api.list_files().unwrap().into_vec().is_empty());
}

#[test]
fn demo_flow() {
    let addr = start_server();
    let mut api = client(addr, "");

    // No token: resource calls never leave the process.
    assert!(matches!(api.list_urls(), Err(ApiError::MissingCredential)));

    let grant = api.issue_demo_token("http://demo.example").unwrap().one().unwrap();
    let demo = grant.token.clone().unwrap();
    assert_eq!(api.token(), Some(demo.as_str()));
    assert_eq!(api.list_urls().unwrap().into_vec().len(), 1);

    api.exchange_demo_token(&demo, "prodABC").unwrap();
    assert_eq!(api.token(), Some("prodABC"));

    let urls = api.list_urls().unwrap().into_vec();
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].url.as_deref(), Some("http://demo.example"));

    // The demo token is gone server-side.
    let old = client(addr, &demo);
    assert!(matches!(old.list_urls(), Err(ApiError::Remote { status: 401, .. })));
}

#[test]
fn unknown_token_is_a_remote_error() {
    let addr = start_server();
    let api = client(addr, "WRONG");
    match api.list_files().unwrap_err() {
        ApiError::Remote { status, payload } => {
            assert_eq!(status, 401);
            assert_eq!(payload["error"], "invalid token");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn connection_refused_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(addr, mock_server::DEFAULT_TOKEN);
    assert!(matches!(api.list_urls(), Err(ApiError::Transport(_))));
}

#[test]
fn non_utf8_body_is_a_malformed_response() {
    let addr = serve_once("200 OK", b"\xff\xfe{not json");
    let api = client(addr, mock_server::DEFAULT_TOKEN);
    match api.list_urls() {
        Err(ApiError::MalformedResponse(_)) => {}
        other => panic!("expected a malformed response, got {other:?}"),
    }
}

#[test]
fn non_utf8_error_body_keeps_its_status() {
    let addr = serve_once("500 Internal Server Error", b"oops \xff");
    let api = client(addr, mock_server::DEFAULT_TOKEN);
    match api.list_files() {
        Err(ApiError::Remote { status, payload }) => {
            assert_eq!(status, 500);
            assert_eq!(payload, "oops \u{fffd}");
        }
        other => panic!("expected a remote error, got {other:?}"),
    }
}

#[test]
fn skipping_tls_verification_warns_and_still_works() {
    let addr = start_server();
    let base_url = format!("http://{addr}/v1");
    let config = ClientConfig::default()
        .with_base_url(&base_url)
        .danger_skip_tls_verify();

    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let transport = tracing::subscriber::with_default(subscriber, || UreqTransport::new(&config));

    let output = logs.contents();
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("TLS certificate verification is disabled"), "{output}");
    assert!(output.contains(&base_url), "{output}");

    let api = ApiClient::with_transport(mock_server::DEFAULT_TOKEN, &base_url, transport);
    api.create_short_url("http://insecure.example").unwrap();
    assert_eq!(api.list_urls().unwrap().into_vec().len(), 1);
}

#[test]
fn verified_transport_does_not_warn() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, || UreqTransport::new(&ClientConfig::default()));
    assert!(logs.contents().is_empty());
}
