/// Minimal `multipart/form-data` encoder for single-file uploads.
///
/// `ureq` 2.x has no multipart support, and the upload endpoint only needs
/// one file part, so the body is assembled by hand per RFC 7578.
use chrono::Utc;

/// An encoded multipart body plus the matching `Content-Type` header value.
#[derive(Debug)]
pub struct MultipartBody {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Encode a single file part under form field `field`.
pub fn encode_file(field: &str, file_name: &str, mime: &str, contents: &[u8]) -> MultipartBody {
    let boundary = make_boundary(contents);
    encode_with_boundary(&boundary, field, file_name, mime, contents)
}

fn encode_with_boundary(
    boundary: &str,
    field: &str,
    file_name: &str,
    mime: &str,
    contents: &[u8],
) -> MultipartBody {
    let mut bytes = Vec::with_capacity(contents.len() + 256);
    bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    bytes.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            escape_quoted(field),
            escape_quoted(file_name)
        )
        .as_bytes(),
    );
    bytes.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
    bytes.extend_from_slice(contents);
    bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    MultipartBody {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        bytes,
    }
}

/// Pick a boundary that does not occur in the payload.
fn make_boundary(contents: &[u8]) -> String {
    let mut seed = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    loop {
        let candidate = format!("----equipviz-{seed:016x}");
        if !contains(contents, candidate.as_bytes()) {
            return candidate;
        }
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Quoted-string values cannot carry raw quotes or line breaks.
fn escape_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], " ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_single_file_part() {
        let body = encode_with_boundary("XYZ", "file", "data.csv", "text/csv", b"a,b\n1,2\n");
        let text = String::from_utf8(body.bytes).unwrap();

        assert_eq!(body.content_type, "multipart/form-data; boundary=XYZ");
        assert!(text.starts_with("--XYZ\r\n"));
        assert!(text.contains(
            "Content-Disposition: form-data; name=\"file\"; filename=\"data.csv\"\r\n"
        ));
        assert!(text.contains("Content-Type: text/csv\r\n\r\na,b\n1,2\n\r\n--XYZ--\r\n"));
    }

    #[test]
    fn escapes_quotes_in_filename() {
        let body = encode_with_boundary("B", "file", "we\"ird.csv", "text/csv", b"");
        let text = String::from_utf8(body.bytes).unwrap();
        assert!(text.contains("filename=\"we\\\"ird.csv\""));
    }

    #[test]
    fn boundary_never_appears_in_payload() {
        let body = encode_file("file", "x.csv", "text/csv", b"plain content");
        let boundary = body.content_type.rsplit('=').next().unwrap().to_string();
        assert!(boundary.starts_with("----equipviz-"));
        assert!(!contains(b"plain content", boundary.as_bytes()));
    }
}
