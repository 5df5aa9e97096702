//! A throwaway HTTP server standing in for Gmail / geckodriver.

use std::io::Read;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use tiny_http::{Header, Response, Server};

#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub url: String,
    pub body: String,
    pub authorization: Option<String>,
}

pub struct MockServer {
    pub base: String,
    pub seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockServer {
    /// Serve every request with `handler(method, url, body) -> (status, json body)`.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &str, &str) -> (u16, String) + Send + 'static,
    {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let addr = format!("127.0.0.1:{port}");
        let server = Server::http(addr.as_str()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        thread::spawn(move || {
            for mut req in server.incoming_requests() {
                let mut body = String::new();
                let _ = req.as_reader().read_to_string(&mut body);
                let method = req.method().to_string();
                let url = req.url().to_string();
                let authorization = req
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.to_string());

                let (status, reply) = handler(&method, &url, &body);
                log.lock().unwrap().push(Seen {
                    method,
                    url,
                    body,
                    authorization,
                });

                let json = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
                let _ = req.respond(
                    Response::from_string(reply)
                        .with_status_code(status)
                        .with_header(json),
                );
            }
        });

        Self {
            base: format!("http://{addr}"),
            seen,
        }
    }

    pub fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}
