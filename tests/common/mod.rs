#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use formwire::{Multipart, MultipartOptions};

pub const BOUNDARY: &str = "X-BOUNDARY";

/// One part to put on the wire.
#[derive(Debug, Clone)]
pub struct TestPart {
    pub name: &'static str,
    pub file_name: Option<&'static str>,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl TestPart {
    pub fn field(name: &'static str, body: &[u8]) -> TestPart {
        TestPart {
            name,
            file_name: None,
            content_type: None,
            body: body.to_vec(),
        }
    }

    pub fn file(name: &'static str, file_name: &'static str, content_type: &'static str, body: &[u8]) -> TestPart {
        TestPart {
            name,
            file_name: Some(file_name),
            content_type: Some(content_type),
            body: body.to_vec(),
        }
    }
}

/// What the parser reported for one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPart {
    pub index: usize,
    pub name: String,
    pub file_name: Option<String>,
    pub is_file: bool,
    pub media_type: Option<String>,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
}

pub fn build_message(boundary: &str, parts: &[TestPart]) -> Vec<u8> {
    let mut out = Vec::new();

    for part in parts {
        out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());

        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{}\"", file_name));
        }
        out.extend_from_slice(disposition.as_bytes());
        out.extend_from_slice(b"\r\n");

        if let Some(content_type) = part.content_type {
            out.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }

        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&part.body);
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    out
}

pub fn chunk_stream(chunks: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    stream::iter(chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))))
}

pub fn split_every(data: &[u8], size: usize) -> Vec<Vec<u8>> {
    data.chunks(size).map(|c| c.to_vec()).collect()
}

pub fn split_at(data: &[u8], at: usize) -> Vec<Vec<u8>> {
    vec![data[..at].to_vec(), data[at..].to_vec()]
}

pub fn multipart_from(chunks: Vec<Vec<u8>>, options: MultipartOptions) -> Multipart<'static> {
    Multipart::with_options(chunk_stream(chunks), options)
}

pub async fn parse_all(mut multipart: Multipart<'_>) -> formwire::Result<Vec<ParsedPart>> {
    let mut parts = Vec::new();

    while let Some(part) = multipart.next_part().await? {
        let headers = part
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_owned(), value.as_bytes().to_vec()))
            .collect();

        let mut parsed = ParsedPart {
            index: part.index(),
            name: part.name().to_owned(),
            file_name: part.file_name().map(|s| s.to_owned()),
            is_file: part.is_file(),
            media_type: part.media_type().map(|s| s.to_owned()),
            headers,
            body: Vec::new(),
        };

        parsed.body = part.bytes().await?.to_vec();
        parts.push(parsed);
    }

    Ok(parts)
}

pub async fn parse_chunks(chunks: Vec<Vec<u8>>, options: MultipartOptions) -> formwire::Result<Vec<ParsedPart>> {
    parse_all(multipart_from(chunks, options)).await
}

/// Flags when the wrapped source stream is dropped.
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub fn tracked_stream(
    chunks: Vec<Vec<u8>>,
    dropped: Arc<AtomicBool>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let flag = DropFlag(dropped);
    chunk_stream(chunks).map(move |chunk| {
        let _ = &flag;
        chunk
    })
}
