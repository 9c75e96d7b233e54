use bytes::Bytes;
use formwire::{Error, Multipart, MultipartOptions};
use http_body_util::{BodyExt, Full, Limited};

mod common;

use common::{build_message, parse_all, TestPart, BOUNDARY};

fn sample_message() -> Vec<u8> {
    build_message(
        BOUNDARY,
        &[
            TestPart::field("title", b"hello"),
            TestPart::file("upload", "a.txt", "text/plain", b"file contents"),
        ],
    )
}

#[tokio::test]
async fn test_http_body_source() {
    let body = Full::new(Bytes::from(sample_message()));
    let multipart = Multipart::new(body.into_data_stream(), BOUNDARY);

    let parsed = parse_all(multipart).await.unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].body, b"hello".to_vec());
    assert_eq!(parsed[1].file_name.as_deref(), Some("a.txt"));
    assert_eq!(parsed[1].body, b"file contents".to_vec());
}

#[tokio::test]
async fn test_limited_http_body_reports_read_failure() {
    let message = sample_message();
    let body = Limited::new(Full::new(Bytes::from(message.clone())), message.len() - 1);
    let mut multipart = Multipart::new(body.into_data_stream(), BOUNDARY);

    let res = multipart.next_part().await;
    assert!(matches!(res, Err(Error::StreamReadFailed(_))));
    assert!(multipart.next_part().await.unwrap().is_none());
}

#[cfg(feature = "tokio-io")]
#[tokio::test]
async fn test_async_reader_source() {
    let message = sample_message();
    let options = MultipartOptions::new(BOUNDARY).max_part_bytes(64);
    let multipart = Multipart::with_reader_with_options(&message[..], options);

    let parsed = parse_all(multipart).await.unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].name, "title");
    assert_eq!(parsed[1].body, b"file contents".to_vec());
}

#[cfg(feature = "json")]
#[tokio::test]
async fn test_json_body() {
    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    let message = build_message(
        BOUNDARY,
        &[
            TestPart::file("point", "p.json", "application/json", br#"{"x": 1, "y": -2}"#),
            TestPart::field("broken", b"{"),
        ],
    );
    let mut multipart = Multipart::new(common::chunk_stream(vec![message]), BOUNDARY);

    let point: Point = multipart.next_part().await.unwrap().unwrap().json().await.unwrap();
    assert_eq!(point, Point { x: 1, y: -2 });

    let broken = multipart.next_part().await.unwrap().unwrap();
    assert!(matches!(broken.json::<Point>().await, Err(Error::DecodeJson(_))));
}

#[tokio::test]
async fn test_options_are_applied() {
    let options = MultipartOptions::new(BOUNDARY).max_part_bytes(4);
    let body = Full::new(Bytes::from(sample_message()));
    let mut multipart = Multipart::with_options(body.into_data_stream(), options);

    let part = multipart.next_part().await.unwrap().unwrap();
    assert!(matches!(part.bytes().await, Err(Error::PartTooLarge { limit: 4, .. })));
}
