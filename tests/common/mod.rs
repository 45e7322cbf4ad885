//! Shared fixtures for integration tests.
#![allow(dead_code)]

use co2_explorer::DashboardConfig;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

pub const SAMPLE_CSV: &str = "\
Country Name;Country Code;Year;CO2 Per Capita (metric tons)
A;AAA;2000;1.0
A;AAA;2001;
B;BBB;2000;3.0
C;CCC;1990;7.0
C;CCC;2001;5.0
D;DDD;2001;
D;DDD;2002;
";

/// Config pointing at `local_path` and an address nothing listens on.
pub fn offline_config(local_path: &Path) -> DashboardConfig {
    DashboardConfig {
        data_url: "http://127.0.0.1:9/CO2_per_capita.csv".to_string(),
        local_path: local_path.to_path_buf(),
        fetch_timeout_secs: 2,
        ..DashboardConfig::default()
    }
}

/// Minimal HTTP server answering every request with `status` and `body`.
pub struct TestServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    pub fn start(status: u16, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                counter.fetch_add(1, Ordering::SeqCst);

                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                while reader.read_line(&mut line).unwrap_or(0) > 0 {
                    if line == "\r\n" {
                        break;
                    }
                    line.clear();
                }

                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self {
            url: format!("http://{addr}/CO2_per_capita.csv"),
            hits,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}
