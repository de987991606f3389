// Minimal HTTP/1.1 stub: answers queued responses in order on an
// ephemeral port and records every request it sees.
#![allow(dead_code)]

use session_dispatch::api::ApiClient;
use session_dispatch::config::API_URL_VAR;
use session_dispatch::session::SESSION_COOKIE;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

pub type TestClient = ApiClient<HashMap<String, String>, HashMap<String, String>>;

pub const TOKEN: &str = "tok-123";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct Canned {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl Canned {
    pub fn json(status: u16, body: &str) -> Self {
        Canned {
            status,
            body: body.to_string(),
            headers: vec![("Content-Type".into(), "application/json".into())],
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Canned {
            status,
            body: body.to_string(),
            headers: vec![("Content-Type".into(), "text/plain".into())],
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

pub struct StubServer {
    pub base_url: String,
    requests: Receiver<Recorded>,
}

impl StubServer {
    pub fn start(responses: Vec<Canned>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
        let addr = listener.local_addr().expect("stub local addr");
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            for canned in responses {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                let recorded = serve_one(stream, &canned).expect("serve stub request");
                if tx.send(recorded).is_err() {
                    return;
                }
            }
        });

        StubServer {
            base_url: format!("http://{}", addr),
            requests: rx,
        }
    }

    /// Next recorded request, waiting briefly for the server thread.
    pub fn next_request(&self) -> Recorded {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("stub received a request")
    }

    /// True if no request reached the server.
    pub fn untouched(&self) -> bool {
        self.requests.recv_timeout(Duration::from_millis(200)).is_err()
    }
}

fn serve_one(stream: TcpStream, canned: &Canned) -> std::io::Result<Recorded> {
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut line = String::new();
    reader.read_line(&mut line)?;
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let body = if headers
        .get("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        read_chunked(&mut reader)?
    } else {
        let len = headers
            .get("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let mut body = vec![0; len];
        reader.read_exact(&mut body)?;
        body
    };

    let mut response = format!("HTTP/1.1 {} Stub\r\n", canned.status);
    for (name, value) in &canned.headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        canned.body.len(),
        canned.body
    ));
    let mut stream = stream;
    stream.write_all(response.as_bytes())?;
    stream.flush()?;

    Ok(Recorded {
        method,
        target,
        headers,
        body,
    })
}

fn read_chunked(reader: &mut impl BufRead) -> std::io::Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line)?;
        let size_hex = size_line.trim().split(';').next().unwrap_or("0");
        let size = usize::from_str_radix(size_hex, 16).unwrap_or(0);
        if size == 0 {
            let mut trailer = String::new();
            reader.read_line(&mut trailer)?;
            return Ok(body);
        }
        let mut chunk = vec![0; size + 2];
        reader.read_exact(&mut chunk)?;
        chunk.truncate(size);
        body.extend_from_slice(&chunk);
    }
}

/// Build a client whose cookie jar and environment are plain maps.
pub fn client(base_url: Option<&str>, session: Option<&str>) -> TestClient {
    let mut cookies = HashMap::new();
    if let Some(token) = session {
        cookies.insert(SESSION_COOKIE.to_string(), token.to_string());
    }
    let mut env = HashMap::new();
    if let Some(url) = base_url {
        env.insert(API_URL_VAR.to_string(), url.to_string());
    }
    ApiClient::new(cookies, env).expect("build test client")
}

/// A base URL nothing is listening on.
pub fn dead_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let addr = listener.local_addr().expect("probe local addr");
    drop(listener);
    format!("http://{}", addr)
}
