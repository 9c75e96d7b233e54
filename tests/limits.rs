use formwire::{Error, Multipart, MultipartOptions, SizeLimit};

mod common;

use common::{build_message, parse_chunks, split_every, TestPart};

fn field_message(body: &[u8]) -> Vec<u8> {
    build_message("X", &[TestPart::field("a", body), TestPart::field("b", b"after")])
}

#[tokio::test]
async fn test_part_limit_is_exact() {
    let body = vec![b'x'; 100];

    for size in &[1, 7, 1000] {
        let options = MultipartOptions::new("X").max_part_bytes(100);
        let parsed = parse_chunks(split_every(&field_message(&body), *size), options).await.unwrap();
        assert_eq!(parsed[0].body.len(), 100);
        assert_eq!(parsed[1].body, b"after".to_vec());

        let options = MultipartOptions::new("X").max_part_bytes(99);
        let res = parse_chunks(split_every(&field_message(&body), *size), options).await;
        assert_eq!(
            res,
            Err(Error::PartTooLarge {
                limit: 99,
                part_name: Some("a".to_owned())
            }),
            "chunk size {}",
            size
        );
    }
}

#[tokio::test]
async fn test_part_limit_applies_to_skipped_parts() {
    let body = vec![b'x'; 100];
    let options = MultipartOptions::new("X").max_part_bytes(50);
    let mut m = Multipart::with_options(common::chunk_stream(vec![field_message(&body)]), options);

    let first = m.next_part().await.unwrap().unwrap();
    assert_eq!(first.name(), "a");

    assert!(matches!(m.next_part().await, Err(Error::PartTooLarge { limit: 50, .. })));
}

#[tokio::test]
async fn test_file_limit_only_applies_to_files() {
    let message = build_message(
        "X",
        &[
            TestPart::field("text", &[b't'; 20]),
            TestPart::file("upload", "a.bin", "application/octet-stream", &[b'f'; 10]),
        ],
    );

    let options = MultipartOptions::new("X").max_file_bytes(10);
    let parsed = parse_chunks(vec![message.clone()], options).await.unwrap();
    assert_eq!(parsed[0].body.len(), 20);
    assert_eq!(parsed[1].body.len(), 10);

    let options = MultipartOptions::new("X").max_file_bytes(9);
    let res = parse_chunks(vec![message.clone()], options).await;
    assert_eq!(
        res,
        Err(Error::PartTooLarge {
            limit: 9,
            part_name: Some("upload".to_owned())
        })
    );

    // The smaller of the part and file limits wins for files.
    let options = MultipartOptions::new("X").max_part_bytes(20).max_file_bytes(100);
    assert!(parse_chunks(vec![message.clone()], options).await.is_ok());

    let options = MultipartOptions::new("X").max_part_bytes(9).max_file_bytes(100);
    assert!(matches!(
        parse_chunks(vec![message], options).await,
        Err(Error::PartTooLarge { limit: 9, .. })
    ));
}

#[tokio::test]
async fn test_per_name_limit() {
    let message = build_message("X", &[TestPart::field("small", b"123456"), TestPart::field("big", &[b'b'; 64])]);

    let limits = SizeLimit::new().per_part(64).for_part("small", 6);
    let options = MultipartOptions::new("X").size_limit(limits);
    assert!(parse_chunks(vec![message.clone()], options).await.is_ok());

    let limits = SizeLimit::new().per_part(64).for_part("small", 5);
    let options = MultipartOptions::new("X").size_limit(limits);
    assert_eq!(
        parse_chunks(vec![message], options).await,
        Err(Error::PartTooLarge {
            limit: 5,
            part_name: Some("small".to_owned())
        })
    );
}

#[tokio::test]
async fn test_header_limit_is_exact() {
    let header_line = "Content-Disposition: form-data; name=\"a\"\r\n";
    let message = field_message(b"hello");
    let limit = header_line.len() as u64;

    for size in &[1, 5, 1000] {
        let options = MultipartOptions::new("X").max_header_bytes(limit);
        assert!(parse_chunks(split_every(&message, *size), options).await.is_ok());

        let options = MultipartOptions::new("X").max_header_bytes(limit - 1);
        assert_eq!(
            parse_chunks(split_every(&message, *size), options).await,
            Err(Error::HeaderTooLarge { limit: limit - 1 }),
            "chunk size {}",
            size
        );
    }
}

#[tokio::test]
async fn test_endless_header_block_is_rejected() {
    let mut data = b"--X\r\nX-Filler: ".to_vec();
    data.extend(std::iter::repeat(b'a').take(64 * 1024));

    let res = parse_chunks(split_every(&data, 1024), MultipartOptions::new("X")).await;
    assert_eq!(res, Err(Error::HeaderTooLarge { limit: 8 * 1024 }));
}

#[tokio::test]
async fn test_whole_stream_limit() {
    let message = field_message(b"hello");
    let len = message.len() as u64;

    let options = MultipartOptions::new("X").size_limit(SizeLimit::new().whole_stream(len));
    assert!(parse_chunks(split_every(&message, 4), options).await.is_ok());

    let options = MultipartOptions::new("X").size_limit(SizeLimit::new().whole_stream(len - 1));
    assert_eq!(
        parse_chunks(split_every(&message, 4), options).await,
        Err(Error::StreamTooLarge { limit: len - 1 })
    );
}

#[tokio::test]
async fn test_limit_error_from_chunk_reader() {
    let options = MultipartOptions::new("X").max_part_bytes(3);
    let mut m = Multipart::with_options(common::chunk_stream(split_every(&field_message(b"abcdef"), 1)), options);

    let mut part = m.next_part().await.unwrap().unwrap();
    let mut read = Vec::new();
    let err = loop {
        match part.chunk().await {
            Ok(Some(chunk)) => read.extend_from_slice(&chunk),
            Ok(None) => panic!("body should exceed the limit"),
            Err(err) => break err,
        }
    };

    assert_eq!(read, b"abc".to_vec());
    assert!(matches!(err, Error::PartTooLarge { limit: 3, .. }));
    assert_eq!(part.chunk().await, Err(Error::PartAlreadyConsumed));
    assert!(m.next_part().await.unwrap().is_none());
}

#[tokio::test]
async fn test_header_count_is_bounded_by_bytes_only() {
    let mut message = b"--X\r\nContent-Disposition: form-data; name=\"a\"\r\n".to_vec();
    for i in 0..40 {
        message.extend_from_slice(format!("X-H{}: v\r\n", i).as_bytes());
    }
    message.extend_from_slice(b"\r\nbody\r\n--X--\r\n");

    for size in &[1, 9, 1000] {
        let parsed = parse_chunks(split_every(&message, *size), MultipartOptions::new("X")).await.unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].headers.len(), 41);
        assert_eq!(parsed[0].body, b"body".to_vec());
    }
}
