use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const SHARE_ID_PREFIX: &str = "u!";

/// Turns a sharing URL into the `shareId` accepted by `/shares/{shareId}`.
pub fn encode_sharing_url(url: &str) -> String {
    let encoded = STANDARD.encode(url.as_bytes());
    let trimmed = encoded.trim_end_matches('=');
    format!(
        "{SHARE_ID_PREFIX}{}",
        trimmed.replace('/', "_").replace('+', "-")
    )
}
