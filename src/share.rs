/// Share links for the read-only viewer
///
/// Two schemes are understood:
/// - `?share=<token>`: base64url JSON with the image and its texts.
///   The older `#share=<token>` fragment form is accepted too.
/// - `?shot=<token>`: base64url of a rendered JPEG snapshot
///
/// Tokens are written unpadded; padded tokens are accepted on the way in.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::color::HexColor;
use crate::error::{Result, ViewerError};
use crate::state::data::ImageRef;

/// Query parameter of the payload scheme
pub const SHARE_PARAM: &str = "share";

/// Query parameter of the snapshot scheme
pub const SHOT_PARAM: &str = "shot";

/// One image with its texts, as carried by a share link
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SharePayload {
    pub img: ImageRef,
    pub thought: String,
    #[serde(rename = "birthDeath")]
    pub birth_death: String,
    /// `"#rrggbb"`, or empty for automatic
    #[serde(rename = "textColor")]
    pub text_color: String,
}

impl SharePayload {
    /// The explicit text color, if the payload carries a valid one
    pub fn color(&self) -> Option<HexColor> {
        HexColor::parse(&self.text_color)
    }
}

/// What a link opened the viewer with
#[derive(Debug, Clone, PartialEq)]
pub enum ShareLink {
    Payload(SharePayload),
    /// Encoded JPEG bytes of a snapshot
    Shot(Vec<u8>),
}

/// base64url without padding
pub fn encode_token(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a base64url token, tolerating padding and the standard alphabet
pub fn decode_token(token: &str) -> Result<Vec<u8>> {
    let normalized: String = token
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_NO_PAD
        .decode(normalized)
        .map_err(|e| ViewerError::CorruptSharePayload(e.to_string()))
}

fn parse_base(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|e| ViewerError::CorruptSharePayload(format!("bad base url `{}`: {}", base, e)))
}

/// Replace (or add) one query parameter and drop the fragment
fn with_param(mut url: Url, name: &str, value: &str, drop: &[&str]) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name && !drop.iter().any(|d| key == d))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.set_fragment(None);
    url.query_pairs_mut().clear().extend_pairs(kept).append_pair(name, value);
    url
}

/// `base?share=<token>` for a payload
pub fn build_share_link(base: &str, payload: &SharePayload) -> Result<String> {
    let json = serde_json::to_vec(payload)?;
    let url = with_param(parse_base(base)?, SHARE_PARAM, &encode_token(&json), &[]);
    Ok(url.into())
}

/// `base?shot=<token>` for JPEG bytes; any `share` parameter is removed
pub fn build_shot_link(base: &str, jpeg: &[u8]) -> Result<String> {
    let url = with_param(parse_base(base)?, SHOT_PARAM, &encode_token(jpeg), &[SHARE_PARAM]);
    Ok(url.into())
}

/// Read a link back. `Ok(None)` means it carries neither scheme.
///
/// A snapshot wins over a payload when both are present.
pub fn parse_share_link(link: &str) -> Result<Option<ShareLink>> {
    let url = Url::parse(link.trim()).map_err(|e| ViewerError::CorruptSharePayload(e.to_string()))?;

    let query = |name: &str| {
        url.query_pairs()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    };

    if let Some(token) = query(SHOT_PARAM) {
        return Ok(Some(ShareLink::Shot(decode_token(&token)?)));
    }

    let fragment_token = || {
        url.fragment().and_then(|fragment| {
            fragment
                .split('&')
                .find_map(|part| part.strip_prefix("share="))
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        })
    };

    match query(SHARE_PARAM).or_else(fragment_token) {
        Some(token) => {
            let json = decode_token(&token)?;
            let payload: SharePayload = serde_json::from_slice(&json)
                .map_err(|e| ViewerError::CorruptSharePayload(e.to_string()))?;
            Ok(Some(ShareLink::Payload(payload)))
        }
        None => Ok(None),
    }
}
