use esdoc_uploader::api::{ApiGateway, HttpGateway};
use esdoc_uploader::GatewayError;
use serde_json::json;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

// Loopback traffic must not be routed through a proxy from the environment.
fn loopback_gateway(base_url: String) -> HttpGateway {
    let client = reqwest::blocking::Client::builder().no_proxy().build().unwrap();
    HttpGateway::with_client(base_url, client)
}

/// Request as seen by the loopback server.
struct Captured {
    request_line: String,
    headers: Vec<String>,
    body: String,
}

/// Serves exactly one request with `status` and `body`, then hands back what
/// the client sent.
fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept connection");
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut headers = Vec::new();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end().to_string();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            headers.push(line.to_ascii_lowercase());
        }
        let mut body_bytes = vec![0; content_length];
        reader.read_exact(&mut body_bytes).unwrap();

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
        stream.flush().unwrap();

        Captured {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: String::from_utf8(body_bytes).unwrap(),
        }
    });
    (base_url, server)
}

#[test]
fn post_json_sends_json_body_with_headers() {
    let (base_url, server) = serve_once("200 OK", r#"{"success":true,"path":"/p"}"#);
    let gateway = loopback_gateway(base_url);

    let response = gateway
        .post_json("/api/create", &json!({ "gitUrl": "git@github.com:a/b.git" }))
        .unwrap();
    let captured = server.join().unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, r#"{"success":true,"path":"/p"}"#);
    assert_eq!(captured.request_line, "POST /api/create HTTP/1.1");
    assert!(captured.headers.iter().any(|h| h == "content-type: application/json"));
    assert!(captured
        .headers
        .iter()
        .any(|h| h == &format!("content-length: {}", captured.body.len())));
    assert_eq!(captured.body, r#"{"gitUrl":"git@github.com:a/b.git"}"#);
}

#[test]
fn get_raw_returns_placeholder_pages_untouched() {
    let (base_url, server) = serve_once("200 OK", "<html><body>soon</body></html>");
    let gateway = loopback_gateway(base_url);

    let response = gateway.get_raw("/p/.finish.json").unwrap();
    let captured = server.join().unwrap();

    assert_eq!(captured.request_line, "GET /p/.finish.json HTTP/1.1");
    assert_eq!(response.body, "<html><body>soon</body></html>");
}

#[test]
fn error_status_carries_body_and_code() {
    let (base_url, server) = serve_once("503 Service Unavailable", "try again later");
    let gateway = loopback_gateway(base_url);

    let err = gateway.get_raw("/p/.finish.json").unwrap_err();
    server.join().unwrap();

    assert_eq!(err.to_string(), "The API responded with a 503");
    assert_eq!(err.body(), Some("try again later"));
    assert!(matches!(err, GatewayError::Status { status: 503, .. }));
}

#[test]
fn connection_failure_is_a_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let gateway = loopback_gateway(format!("http://127.0.0.1:{port}"));

    let err = gateway.post_json("/api/create", &json!({})).unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
    assert_eq!(err.body(), None);
}
