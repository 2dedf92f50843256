//! Request boundary tests against a local HTTP origin.
//!
//! A throwaway origin server on 127.0.0.1 serves canned responses, so the
//! full validate → fetch → process → encode path runs with the real fetcher.

use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::net::TcpListener;

use picbox::config::Config;
use picbox::error::ErrorKind;
use picbox::security::sign;
use picbox::service::ImageService;

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([10, 200, 30])))
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// Start an origin that answers every request with `status` and `body`
fn start_origin(status: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nCache-Control: public, max-age=3600\r\nLast-Modified: Wed, 21 Oct 2015 07:28:00 GMT\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
        }
    });
    format!("http://127.0.0.1:{}", addr.port())
}

fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn service(yaml: &str) -> ImageService {
    let config = Config::from_yaml_with_env(yaml).unwrap();
    config.validate().unwrap();
    ImageService::new(&config).unwrap()
}

fn error_code(body: &[u8]) -> u64 {
    let value: serde_json::Value = serde_json::from_slice(body).unwrap();
    value["error_code"].as_u64().unwrap()
}

#[tokio::test]
async fn test_resize_from_origin() {
    let origin = start_origin("200 OK", png(400, 300));
    let url = format!("{}/photo.png", origin);
    let svc = service("{}");

    let response = svc
        .handle(
            &args(&[("url", &url), ("w", "100"), ("h", "100"), ("fmt", "jpeg")]),
            "",
        )
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("image/jpeg"));
    assert_eq!(response.header("cache-control"), Some("public, max-age=3600"));
    assert!(response.header("last-modified").is_some());
    let img = image::load_from_memory(&response.body).unwrap();
    assert_eq!(img.dimensions(), (100, 100));
}

#[tokio::test]
async fn test_origin_error_status() {
    let origin = start_origin("404 Not Found", Vec::new());
    let url = format!("{}/missing.png", origin);
    let svc = service("{}");

    let response = svc.handle(&args(&[("url", &url), ("w", "10")]), "").await;
    assert_eq!(response.status, ErrorKind::Fetch.to_http_status());
    assert_eq!(error_code(&response.body), ErrorKind::Fetch.error_code() as u64);
}

#[tokio::test]
async fn test_signed_request() {
    let origin = start_origin("200 OK", png(50, 50));
    let url = format!("{}/a.png", origin);
    let svc = service("security:\n  client_key: topsecret\n  client_name: web\n");

    let query = format!("url={}&w=20&client=web", url);
    let pairs = [("url", url.as_str()), ("w", "20"), ("client", "web")];

    let unsigned = svc.handle(&args(&pairs), &query).await;
    assert_eq!(unsigned.status, 403);
    assert_eq!(error_code(&unsigned.body), ErrorKind::Signature.error_code() as u64);

    let signed = svc.handle(&args(&pairs), &sign("topsecret", &query)).await;
    assert_eq!(signed.status, 200);
    assert_eq!(
        image::load_from_memory(&signed.body).unwrap().dimensions(),
        (20, 20)
    );
}

#[tokio::test]
async fn test_host_not_allowed() {
    let svc = service("security:\n  allowed_hosts: [\"*.example.com\"]\n");
    let response = svc
        .handle(&args(&[("url", "http://127.0.0.1:1/a.png"), ("w", "10")]), "")
        .await;
    assert_eq!(response.status, 403);
    assert_eq!(error_code(&response.body), ErrorKind::Host.error_code() as u64);
}

#[tokio::test]
async fn test_rotate_expand_from_origin() {
    let origin = start_origin("200 OK", png(40, 20));
    let url = format!("{}/r.png", origin);
    let svc = service("{}");

    let response = svc
        .handle(
            &args(&[("url", &url), ("op", "rotate"), ("deg", "90"), ("expand", "1")]),
            "",
        )
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(
        image::load_from_memory(&response.body).unwrap().dimensions(),
        (20, 40)
    );
}

#[tokio::test]
async fn test_concurrent_requests_share_fetch_limit() {
    let origin = start_origin("200 OK", png(64, 64));
    let url = format!("{}/c.png", origin);
    let svc = service("fetch:\n  max_requests: 2\n");

    let mut handles = Vec::new();
    for i in 0..6u32 {
        let svc = svc.clone();
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            let width = (10 + i).to_string();
            svc.handle(&args(&[("url", &url), ("w", &width)]), "").await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let response = handle.await.unwrap();
        assert_eq!(response.status, 200);
        let img = image::load_from_memory(&response.body).unwrap();
        assert_eq!(img.width(), 10 + i as u32);
    }
}
