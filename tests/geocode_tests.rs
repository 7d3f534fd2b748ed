use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use photo_geotagger::core::geocode::{grid_key, GeoError, GeoResolver, GeoResolverConfig};

const BERLIN_BODY: &str = r#"{"place_id":1,"address":{"city":"Berlin","state":"Berlin","country":"Deutschland","country_code":"de"}}"#;

struct GeoFixture {
    endpoint: String,
    hits: Arc<Mutex<Vec<Instant>>>,
    requests: Arc<AtomicUsize>,
}

/// Minimal canned-response HTTP server. Every connection is answered with
/// the same status line and body; the first response can be delayed to
/// simulate a slow upstream.
fn spawn_fixture(
    status_line: &'static str,
    body: &'static str,
    first_delay: Duration,
) -> GeoFixture {
    let listener = TcpListener::bind("127.0.0.1:0").expect("should bind test listener");
    let addr = listener.local_addr().expect("should read listener addr");
    let hits = Arc::new(Mutex::new(Vec::new()));
    let requests = Arc::new(AtomicUsize::new(0));

    let thread_hits = Arc::clone(&hits);
    let thread_requests = Arc::clone(&requests);
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let count = thread_requests.fetch_add(1, Ordering::SeqCst);
            thread_hits
                .lock()
                .expect("hit log should not be poisoned")
                .push(Instant::now());
            let delay = if count == 0 { first_delay } else { Duration::ZERO };
            std::thread::spawn(move || respond(stream, status_line, body, delay));
        }
    });

    GeoFixture {
        endpoint: format!("http://{addr}/reverse"),
        hits,
        requests,
    }
}

fn respond(mut stream: TcpStream, status_line: &str, body: &str, delay: Duration) {
    let mut buf = [0u8; 4096];
    let mut seen: Vec<u8> = Vec::new();
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                seen.extend_from_slice(&buf[..n]);
                if seen.windows(4).any(|window| window == b"\r\n\r\n") {
                    break;
                }
            }
            Err(_) => return,
        }
    }

    if !delay.is_zero() {
        std::thread::sleep(delay);
    }

    let response = format!(
        "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
}

fn test_config(endpoint: &str) -> GeoResolverConfig {
    let mut config = GeoResolverConfig::with_user_agent("photo-geotagger-tests/0.1");
    config.endpoint = endpoint.to_string();
    config.min_interval = Duration::from_millis(50);
    config.request_timeout = Duration::from_millis(2000);
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn maps_richest_address_components() {
    let fixture = spawn_fixture("HTTP/1.1 200 OK", BERLIN_BODY, Duration::ZERO);
    let resolver =
        GeoResolver::new(test_config(&fixture.endpoint)).expect("should build resolver");

    let place = resolver.resolve(52.5, 13.4).await.expect("should resolve place");

    assert_eq!(place.city, "Berlin");
    assert_eq!(place.province_or_state, "Berlin");
    assert_eq!(place.country, "Deutschland");
    assert_eq!(place.country_code.as_deref(), Some("DE"));

    let encoded = serde_json::to_value(&place).expect("should serialize place");
    assert_eq!(encoded["City"], "Berlin");
    assert_eq!(encoded["Province-State"], "Berlin");
    assert_eq!(encoded["CountryCode"], "DE");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn falls_back_to_town_and_region_and_omits_missing_country_code() {
    let fixture = spawn_fixture(
        "HTTP/1.1 200 OK",
        r#"{"address":{"town":"Greenfield","region":"Uplands","country":"Atlantis"}}"#,
        Duration::ZERO,
    );
    let resolver =
        GeoResolver::new(test_config(&fixture.endpoint)).expect("should build resolver");

    let place = resolver.resolve(10.0, 10.0).await.expect("should resolve place");

    assert_eq!(place.city, "Greenfield");
    assert_eq!(place.province_or_state, "Uplands");
    assert_eq!(place.country, "Atlantis");
    assert_eq!(place.country_code, None);

    // Absent country code is omitted entirely, never serialized as "".
    let encoded = serde_json::to_value(&place).expect("should serialize place");
    assert!(encoded.get("CountryCode").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn nearby_lookups_share_one_network_call() {
    let fixture = spawn_fixture("HTTP/1.1 200 OK", BERLIN_BODY, Duration::ZERO);
    let resolver =
        GeoResolver::new(test_config(&fixture.endpoint)).expect("should build resolver");

    let first = resolver
        .resolve(52.50001, 13.40001)
        .await
        .expect("first lookup should resolve");
    let second = resolver
        .resolve(52.50004, 13.39999)
        .await
        .expect("second lookup should resolve");

    assert_eq!(first, second);
    assert_eq!(fixture.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_respect_minimum_interval() {
    let fixture = spawn_fixture("HTTP/1.1 200 OK", BERLIN_BODY, Duration::ZERO);
    let mut config = test_config(&fixture.endpoint);
    config.min_interval = Duration::from_millis(300);
    let resolver = Arc::new(GeoResolver::new(config).expect("should build resolver"));

    let cells = [(52.5, 13.4), (48.85, 2.35), (40.71, -74.0)];
    let mut tasks = Vec::new();
    for (lat, lon) in cells {
        let resolver = Arc::clone(&resolver);
        tasks.push(tokio::spawn(async move { resolver.resolve(lat, lon).await }));
    }
    for task in tasks {
        task.await
            .expect("task should not panic")
            .expect("each cell should resolve");
    }

    let hits = fixture.hits.lock().expect("hit log should not be poisoned");
    assert_eq!(hits.len(), 3);
    let mut times: Vec<Instant> = hits.clone();
    times.sort();
    for pair in times.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(
            gap >= Duration::from_millis(250),
            "network calls only {gap:?} apart"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timeout_surfaces_and_is_not_cached() {
    let fixture = spawn_fixture("HTTP/1.1 200 OK", BERLIN_BODY, Duration::from_millis(800));
    let mut config = test_config(&fixture.endpoint);
    config.request_timeout = Duration::from_millis(200);
    let resolver = GeoResolver::new(config).expect("should build resolver");

    let first = resolver.resolve(52.5, 13.4).await;
    assert!(matches!(first, Err(GeoError::Timeout)));
    assert_eq!(resolver.cached_entries().await, 0);

    let second = resolver
        .resolve(52.5, 13.4)
        .await
        .expect("retry should resolve once upstream is fast");
    assert_eq!(second.city, "Berlin");
    assert_eq!(fixture.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn upstream_errors_are_not_cached() {
    let fixture = spawn_fixture(
        "HTTP/1.1 500 Internal Server Error",
        "{}",
        Duration::ZERO,
    );
    let resolver =
        GeoResolver::new(test_config(&fixture.endpoint)).expect("should build resolver");

    assert!(matches!(
        resolver.resolve(52.5, 13.4).await,
        Err(GeoError::Status(500))
    ));
    assert!(matches!(
        resolver.resolve(52.5, 13.4).await,
        Err(GeoError::Status(500))
    ));
    assert_eq!(fixture.requests.load(Ordering::SeqCst), 2);
}

#[test]
fn missing_user_agent_is_a_configuration_error() {
    let result = GeoResolver::new(GeoResolverConfig::default());
    assert!(matches!(result, Err(GeoError::MissingUserAgent)));

    let blank = GeoResolver::new(GeoResolverConfig::with_user_agent("   "));
    assert!(matches!(blank, Err(GeoError::MissingUserAgent)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn out_of_range_coordinates_never_reach_the_network() {
    let fixture = spawn_fixture("HTTP/1.1 200 OK", BERLIN_BODY, Duration::ZERO);
    let resolver =
        GeoResolver::new(test_config(&fixture.endpoint)).expect("should build resolver");

    assert!(matches!(
        resolver.resolve(95.0, 10.0).await,
        Err(GeoError::InvalidCoordinate(_, _))
    ));
    assert!(matches!(
        resolver.resolve(10.0, -181.0).await,
        Err(GeoError::InvalidCoordinate(_, _))
    ));
    assert_eq!(fixture.requests.load(Ordering::SeqCst), 0);
}

#[test]
fn grid_key_quantizes_and_normalizes_zero() {
    assert_eq!(grid_key(52.50001, 13.40001, 4), "52.5000,13.4000");
    assert_eq!(grid_key(1.0, 2.0, 4), "1.0000,2.0000");
    // Coordinates rounding to zero from either side share one cell.
    assert_eq!(grid_key(-0.00001, 0.00001, 4), "0.0000,0.0000");
}
