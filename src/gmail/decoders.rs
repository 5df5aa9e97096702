use anyhow::{Result, anyhow};
use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Gmail returns base64url payloads, sometimes without padding.
const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn decode_body_data(data: &str) -> Result<Vec<u8>> {
    GMAIL_BASE64
        .decode(data.trim())
        .map_err(|e| anyhow!("invalid base64url attachment data: {e}"))
}

/// Replace everything except word characters, `-`, `_`, `.` and space with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let clean: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // "", "." and ".." would name a directory
    if clean.chars().all(|c| c == '.') {
        format!("attachment{}", clean.replace('.', "_"))
    } else {
        clean
    }
}

/// Bare address out of a `From` header: `Ann <ann@x.org>` -> `ann@x.org`.
/// Falls back to the trimmed header when it does not parse.
pub fn sender_address(from: &str) -> String {
    let first = mailparse::addrparse(from).ok().and_then(|list| {
        list.iter().find_map(|a| match a {
            mailparse::MailAddr::Single(info) => Some(info.addr.clone()),
            mailparse::MailAddr::Group(g) => g.addrs.first().map(|i| i.addr.clone()),
        })
    });
    first
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| from.trim().to_string())
}
