// urlprobe-lib/tests/integration.rs

//! End-to-end runs of the library against a local HTTP responder.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use urlprobe_lib::{
    ConcurrencyMode, HttpProbe, Probe, ProbeConfig, ProbeOutcome, ProbeRunner, ProbeStats,
    ReportSink, StatsReport,
};

// ============================================================
// Test server
// ============================================================

/// Minimal HTTP/1.1 responder. The status is picked from the path:
/// `/ok` → 200, `/missing` → 404, `/error` → 500, `/moved` → 301,
/// `/hang` → never answers. Every request's Content-type header is kept.
struct TestServer {
    addr: SocketAddr,
    content_types: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let content_types = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&content_types);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let seen = Arc::clone(&seen);
                tokio::spawn(serve_connection(stream, seen));
            }
        });

        Self {
            addr,
            content_types,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn serve_connection(mut stream: TcpStream, seen: Arc<Mutex<Vec<String>>>) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let head_end = loop {
            if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            }
        };

        let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
        buffer.drain(..head_end);

        let path = head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or("/")
            .to_string();
        if let Some(value) = head.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-type")
                .then(|| value.trim().to_string())
        }) {
            seen.lock().unwrap().push(value);
        }

        let status = match path.as_str() {
            "/ok" => "200 OK",
            "/missing" => "404 Not Found",
            "/error" => "500 Internal Server Error",
            "/moved" => "301 Moved Permanently",
            "/hang" => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                return;
            }
            _ => "200 OK",
        };
        let response = format!("HTTP/1.1 {}\r\nContent-Length: 0\r\n\r\n", status);
        if stream.write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

// ============================================================
// Helpers
// ============================================================

#[derive(Default)]
struct CollectingSink {
    finals: Mutex<Vec<StatsReport>>,
}

impl ReportSink for CollectingSink {
    fn periodic(&self, _report: &StatsReport, _first: bool) {}

    fn final_report(&self, report: &StatsReport) {
        self.finals.lock().unwrap().push(report.clone());
    }
}

/// Write a URL list with a header line.
fn url_file(urls: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "url").unwrap();
    for url in urls {
        writeln!(file, "{}", url).unwrap();
    }
    file.flush().unwrap();
    file
}

fn quick_config(config: ProbeConfig) -> ProbeConfig {
    config
        .with_timeout(Duration::from_secs(5))
        .with_success_delay(Duration::from_millis(5))
}

// ============================================================
// End-to-end scenarios
// ============================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_three_successes_with_single_worker() {
    let server = TestServer::start().await;
    let file = url_file(&vec![server.url("/ok"); 3]);
    let sink = Arc::new(CollectingSink::default());

    let runner = ProbeRunner::new(ProbeConfig::bounded(1))
        .unwrap()
        .with_sink(sink.clone());
    let summary = runner.run_file(file.path()).await.unwrap();

    assert_eq!(summary.mode, ConcurrencyMode::Bounded { workers: 1 });
    assert_eq!(summary.stats.requests, 3);
    assert_eq!(summary.stats.successes, 3);
    assert_eq!(summary.stats.connect_errors, 0);
    assert_eq!(summary.stats.not_200_errors, 0);
    assert_eq!(summary.stats.not_found_errors, 0);
    assert_eq!(summary.stats.peak_in_flight, 1);

    let finals = sink.finals.lock().unwrap();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].stats.successes, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_counts_as_connection_error() {
    let server = TestServer::start().await;
    let file = url_file(&[server.url("/hang")]);

    let config = ProbeConfig::bounded(1).with_timeout(Duration::from_millis(300));
    let runner = ProbeRunner::new(config)
        .unwrap()
        .with_sink(Arc::new(CollectingSink::default()));
    let summary = runner.run_file(file.path()).await.unwrap();

    assert_eq!(summary.stats.requests, 1);
    assert_eq!(summary.stats.connect_errors, 1);
    assert_eq!(summary.stats.successes, 0);
    // latency is recorded for failed requests too
    assert!(summary.stats.avg_request_ms >= 250.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_not_found_is_counted_separately() {
    let server = TestServer::start().await;
    let file = url_file(&[server.url("/missing")]);

    let runner = ProbeRunner::new(quick_config(ProbeConfig::bounded(1)))
        .unwrap()
        .with_sink(Arc::new(CollectingSink::default()));
    let summary = runner.run_file(file.path()).await.unwrap();

    assert_eq!(summary.stats.requests, 1);
    assert_eq!(summary.stats.not_found_errors, 1);
    assert_eq!(summary.stats.not_200_errors, 0);
    assert_eq!(summary.stats.connect_errors, 0);
    assert_eq!(summary.stats.successes, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_mixed_outcomes_sum_to_total() {
    let server = TestServer::start().await;
    let mut urls = Vec::new();
    for _ in 0..4 {
        urls.push(server.url("/ok"));
        urls.push(server.url("/missing"));
        urls.push(server.url("/error"));
        urls.push(server.url("/moved"));
    }
    let file = url_file(&urls);

    let runner = ProbeRunner::new(quick_config(ProbeConfig::bounded(4)))
        .unwrap()
        .with_sink(Arc::new(CollectingSink::default()));
    let summary = runner.run_file(file.path()).await.unwrap();

    let stats = &summary.stats;
    assert_eq!(stats.requests, 16);
    assert_eq!(stats.successes, 4);
    assert_eq!(stats.not_found_errors, 4);
    // redirects without a Location are plain non-200 answers
    assert_eq!(stats.not_200_errors, 8);
    assert_eq!(stats.classified(), stats.requests);
    assert!(stats.peak_in_flight <= 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_urls_never_counted() {
    let server = TestServer::start().await;
    let mut urls = vec![server.url("/ok"); 5];
    urls.extend(
        ["", "not a url", "ftp://files.test/x", "www.example.com"]
            .iter()
            .map(|s| s.to_string()),
    );
    let file = url_file(&urls);

    let runner = ProbeRunner::new(quick_config(ProbeConfig::bounded(2)))
        .unwrap()
        .with_sink(Arc::new(CollectingSink::default()));
    let summary = runner.run_file(file.path()).await.unwrap();

    assert_eq!(summary.enqueued, 9);
    assert_eq!(summary.consumed(), 9);
    assert_eq!(summary.stats.requests, 5);
    assert_eq!(summary.stats.successes, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unrestricted_run_drains_all_tasks() {
    let server = TestServer::start().await;
    let file = url_file(&vec![server.url("/ok"); 50]);

    let config = quick_config(ProbeConfig::unrestricted()).with_throttle(20, Duration::from_millis(50));
    let runner = ProbeRunner::new(config)
        .unwrap()
        .with_sink(Arc::new(CollectingSink::default()));
    let summary = runner.run_file(file.path()).await.unwrap();

    assert_eq!(summary.mode, ConcurrencyMode::Unbounded);
    assert_eq!(summary.outstanding_tasks, 0);
    assert_eq!(summary.throttle_pauses(), 2);
    assert_eq!(summary.stats.requests, 50);
    assert_eq!(summary.stats.successes, 50);
    assert_eq!(summary.stats.in_flight, 0);
}

// ============================================================
// Request executor details
// ============================================================

#[tokio::test]
async fn test_request_carries_json_content_type() {
    let server = TestServer::start().await;
    let probe = HttpProbe::new(&quick_config(ProbeConfig::bounded(1))).unwrap();
    let stats = ProbeStats::new();

    let outcome = probe.probe(&server.url("/ok"), &stats).await;

    assert_eq!(outcome, ProbeOutcome::Success);
    let seen = server.content_types.lock().unwrap();
    assert_eq!(seen.as_slice(), ["application/json"]);
}

#[tokio::test]
async fn test_success_delay_not_in_latency() {
    let server = TestServer::start().await;
    let config = ProbeConfig::bounded(1).with_success_delay(Duration::from_millis(300));
    let probe = HttpProbe::new(&config).unwrap();
    let stats = ProbeStats::new();

    let began = Instant::now();
    let outcome = probe.probe(&server.url("/ok"), &stats).await;

    assert_eq!(outcome, ProbeOutcome::Success);
    assert!(began.elapsed() >= Duration::from_millis(300));
    let snap = stats.snapshot();
    assert!(
        snap.avg_request_ms < 300.0,
        "latency {}ms includes the success delay",
        snap.avg_request_ms
    );
}

#[tokio::test]
async fn test_failures_skip_success_delay() {
    let server = TestServer::start().await;
    let config = ProbeConfig::bounded(1).with_success_delay(Duration::from_secs(2));
    let probe = HttpProbe::new(&config).unwrap();
    let stats = ProbeStats::new();

    let began = Instant::now();
    let outcome = probe.probe(&server.url("/error"), &stats).await;

    assert_eq!(outcome, ProbeOutcome::HttpError(500));
    assert!(began.elapsed() < Duration::from_secs(2));
}
