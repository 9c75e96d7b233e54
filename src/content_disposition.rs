use crate::headers::PartHeaders;

pub(crate) struct ContentDisposition {
    pub(crate) field_name: String,
    pub(crate) file_name: Option<String>,
}

impl ContentDisposition {
    pub(crate) fn parse(headers: &PartHeaders) -> crate::Result<ContentDisposition> {
        let value = headers
            .get(http::header::CONTENT_DISPOSITION.as_str())
            .ok_or_else(|| crate::Error::invalid_headers("missing Content-Disposition header"))?;

        let value = std::str::from_utf8(value.as_bytes())
            .map_err(|_| crate::Error::invalid_headers("Content-Disposition header is not valid UTF-8"))?;

        let mut field_name = None;
        let mut file_name = None;
        let mut ext_file_name = None;

        for (key, val) in Params::new(value) {
            if key.eq_ignore_ascii_case("name") {
                field_name.get_or_insert(val);
            } else if key.eq_ignore_ascii_case("filename") {
                file_name.get_or_insert(val);
            } else if key.eq_ignore_ascii_case("filename*") {
                if ext_file_name.is_none() {
                    ext_file_name = decode_ext_value(&val);
                }
            }
        }

        let field_name =
            field_name.ok_or_else(|| crate::Error::invalid_headers("missing name parameter in Content-Disposition"))?;

        Ok(ContentDisposition {
            field_name,
            file_name: ext_file_name.or(file_name),
        })
    }
}

/// Iterates over the `key=value` parameters following the disposition type.
struct Params<'a> {
    rest: &'a str,
}

impl<'a> Params<'a> {
    fn new(value: &'a str) -> Params<'a> {
        // skip the disposition type, e.g. `form-data`.
        let rest = match memchr::memchr(b';', value.as_bytes()) {
            Some(idx) => &value[idx + 1..],
            None => "",
        };
        Params { rest }
    }
}

impl<'a> Iterator for Params<'a> {
    type Item = (&'a str, String);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.rest = self.rest.trim_start_matches(|c: char| c == ';' || c.is_ascii_whitespace());
            if self.rest.is_empty() {
                return None;
            }

            let key_end = self.rest.find(|c: char| c == '=' || c == ';').unwrap_or(self.rest.len());
            let key = self.rest[..key_end].trim();
            self.rest = &self.rest[key_end..];

            if !self.rest.starts_with('=') {
                // a flag parameter without a value.
                continue;
            }
            self.rest = self.rest[1..].trim_start();

            let val = if self.rest.starts_with('"') {
                let (val, consumed) = read_quoted(&self.rest[1..]);
                self.rest = &self.rest[1 + consumed..];
                val
            } else {
                let end = memchr::memchr(b';', self.rest.as_bytes()).unwrap_or(self.rest.len());
                let val = self.rest[..end].trim().to_owned();
                self.rest = &self.rest[end..];
                val
            };

            if key.is_empty() {
                continue;
            }
            return Some((key, val));
        }
    }
}

/// Reads a quoted string whose opening quote was already consumed. Returns
/// the unescaped value and how many bytes were consumed, closing quote
/// included. An unterminated string runs to the end of the input.
fn read_quoted(input: &str) -> (String, usize) {
    let mut val = String::new();
    let mut chars = input.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return (val, idx + 1),
            // browsers leave backslashes in Windows paths unescaped.
            '\\' => match chars.peek() {
                Some(&(_, next)) if next == '"' || next == '\\' => {
                    val.push(next);
                    chars.next();
                }
                _ => val.push('\\'),
            },
            c => val.push(c),
        }
    }

    (val, input.len())
}

/// Decodes an RFC 5987 extended value such as `UTF-8''na%C3%AFve.txt`.
fn decode_ext_value(val: &str) -> Option<String> {
    let mut segments = val.splitn(3, '\'');
    let charset = segments.next()?;
    let _language = segments.next()?;
    let encoded = segments.next()?;

    let bytes: Vec<u8> = percent_encoding::percent_decode_str(encoded).collect();

    let encoding = encoding_rs::Encoding::for_label(charset.as_bytes())?;
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes)
        .map(|text| text.into_owned())
}
