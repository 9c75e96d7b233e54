use std::convert::TryFrom;

use http::header::{HeaderName, HeaderValue};
use httparse::Header;

use crate::headers::PartHeaders;

pub(crate) fn convert_raw_headers(raw_headers: &[Header]) -> crate::Result<PartHeaders> {
    let mut headers = PartHeaders::with_capacity(raw_headers.len());

    for raw_header in raw_headers {
        let name = HeaderName::try_from(raw_header.name)
            .map_err(|e| crate::Error::invalid_headers(format!("invalid header name {:?}: {}", raw_header.name, e)))?;

        let value = HeaderValue::from_bytes(raw_header.value)
            .map_err(|e| crate::Error::invalid_headers(format!("invalid value for header {:?}: {}", raw_header.name, e)))?;

        headers.push(name, value);
    }

    Ok(headers)
}
