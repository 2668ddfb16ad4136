use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use cosmos_browser::config::ApiConfig;

/// Serves exactly one HTTP response, then returns the request line it saw.
pub struct OneShot {
    pub base_url: String,
    handle: JoinHandle<String>,
}

impl OneShot {
    pub fn serve(status: &str, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind free port");
        let port = listener.local_addr().expect("local addr").port();
        let status = status.to_string();
        let body = body.to_string();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("read request line");
            loop {
                let mut header = String::new();
                let n = reader.read_line(&mut header).expect("read header");
                if n == 0 || header == "\r\n" {
                    break;
                }
            }
            let mut stream = stream;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .expect("write response");
            request_line.trim_end().to_string()
        });

        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            handle,
        }
    }

    pub fn request_line(self) -> String {
        self.handle.join().expect("responder thread")
    }
}

pub fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        images_base_url: base_url.to_string(),
        neo_base_url: format!("{base_url}/neo/rest/v1"),
        api_key: "test-key".into(),
        timeout_secs: 5,
    }
}
