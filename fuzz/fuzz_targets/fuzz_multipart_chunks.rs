#![no_main]

use std::convert::Infallible;

use formwire::bytes::Bytes;
use formwire::{Multipart, MultipartOptions};
use futures_util::stream;
use libfuzzer_sys::fuzz_target;
use tokio::runtime;

// The first input byte picks the chunk size so that every split of the
// message gets exercised.
fuzz_target!(|data: &[u8]| {
    let (chunk_size, data) = match data.split_first() {
        Some((&size, rest)) => (usize::from(size).max(1), rest),
        None => return,
    };

    let chunks: Vec<Result<Bytes, Infallible>> = data
        .chunks(chunk_size)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();

    let options = MultipartOptions::new("X").max_header_bytes(256).max_part_bytes(4096);
    let mut multipart = Multipart::with_options(stream::iter(chunks), options);

    let rt = runtime::Builder::new_current_thread().build().expect("runtime");
    rt.block_on(async {
        let mut count = 0;
        loop {
            match multipart.next_part().await {
                Ok(Some(mut part)) => {
                    count += 1;
                    // Leave every other body unread so skipping gets covered too.
                    if count % 2 == 0 {
                        while let Ok(Some(_)) = part.chunk().await {}
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    assert!(matches!(multipart.next_part().await, Ok(None)));
                    break;
                }
            }
        }
    })
});
