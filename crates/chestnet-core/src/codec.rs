//! Key codec
//!
//! Reversible string forms for container keys and the deterministic
//! derivation of network ids from a display name and colour. The record
//! delimiter `|` never appears in any encoded field.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::errors::{ChestnetError, Result};
use crate::identifiers::{ColorTag, ContainerKey, NetworkId};

/// Slug used when a display name has no alphanumeric content
pub const UNNAMED_SLUG: &str = "unnamed";

/// Characters never allowed inside an encoded realm
const REALM_RESERVED: [char; 5] = ['|', '@', ',', '\n', '\r'];

/// Characters escaped by [`percent_encode`]
const PERCENT_RESERVED: [char; 5] = ['%', '|', '=', '\n', '\r'];

/// Reject keys whose realm cannot be encoded unchanged
///
/// Registry and token entry points call this, so two distinct keys never
/// share one persisted form.
pub fn check_container_key(key: &ContainerKey) -> Result<()> {
    if key.realm.trim().is_empty() {
        return Err(ChestnetError::invalid(format!(
            "container {key} has an empty realm"
        )));
    }
    if let Some(c) = key.realm.chars().find(|c| REALM_RESERVED.contains(c)) {
        return Err(ChestnetError::invalid(format!(
            "container realm {:?} contains reserved character {c:?}",
            key.realm
        )));
    }
    Ok(())
}

/// Encode a container key as `realm@x,y,z`
///
/// Reserved characters are stripped from the realm; keys that passed
/// [`check_container_key`] encode unchanged.
pub fn encode_container_key(key: &ContainerKey) -> String {
    format!(
        "{}@{},{},{}",
        sanitize_realm(&key.realm),
        key.x,
        key.y,
        key.z
    )
}

/// Decode a container key
///
/// Accepts the canonical `realm@x,y,z` form and the legacy `x,y,z,realm`
/// form. Anything else is rejected.
pub fn decode_container_key(raw: &str) -> Result<ContainerKey> {
    if let Some((realm, coords)) = raw.rsplit_once('@') {
        let parts: Vec<&str> = coords.split(',').collect();
        let [x, y, z] = parts.as_slice() else {
            return Err(ChestnetError::decode(format!(
                "container key needs three coordinates: {raw:?}"
            )));
        };
        return build_key(raw, realm, x, y, z);
    }

    let parts: Vec<&str> = raw.split(',').collect();
    match parts.as_slice() {
        [x, y, z, realm] => build_key(raw, realm, x, y, z),
        _ => Err(ChestnetError::decode(format!(
            "unrecognised container key: {raw:?}"
        ))),
    }
}

fn build_key(raw: &str, realm: &str, x: &str, y: &str, z: &str) -> Result<ContainerKey> {
    let realm = realm.trim();
    if realm.is_empty() || realm.contains(REALM_RESERVED) {
        return Err(ChestnetError::decode(format!(
            "container key has invalid realm: {raw:?}"
        )));
    }
    let coord = |s: &str| {
        s.trim().parse::<i32>().map_err(|_| {
            ChestnetError::decode(format!("container key has bad coordinate {s:?}: {raw:?}"))
        })
    };
    Ok(ContainerKey::new(realm, coord(x)?, coord(y)?, coord(z)?))
}

fn sanitize_realm(realm: &str) -> String {
    realm.chars().filter(|c| !REALM_RESERVED.contains(c)).collect()
}

/// Normalize a display name into a slug
///
/// Decomposes, drops diacritics, lower-cases and collapses every run of
/// non-alphanumeric characters into one `-`.
pub fn slugify(display_name: &str) -> String {
    let mut slug = String::with_capacity(display_name.len());
    let mut pending_dash = false;

    for c in display_name.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        UNNAMED_SLUG.to_string()
    } else {
        slug
    }
}

/// Derive the network id for a display name and colour
pub fn encode_network_id(display_name: &str, color: ColorTag) -> NetworkId {
    NetworkId::from_parts(&slugify(display_name), color)
}

/// Escape the record delimiters in a free-form field
pub fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if PERCENT_RESERVED.contains(&c) {
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverse [`percent_encode`]
///
/// Truncated or non-hex escapes and invalid UTF-8 are decode errors.
pub fn percent_decode(raw: &str) -> Result<String> {
    let bytes = raw.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3).ok_or_else(|| {
                ChestnetError::decode(format!("truncated percent escape in {raw:?}"))
            })?;
            let value = std::str::from_utf8(hex)
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| {
                    ChestnetError::decode(format!("invalid percent escape in {raw:?}"))
                })?;
            out.push(value);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out)
        .map_err(|e| ChestnetError::decode(format!("invalid utf8 after unescaping: {e}")))
}

/// Reverse [`percent_encode`], leaving anything it never produces literal
///
/// Used for free text that older records stored unescaped, where a bare `%`
/// is ordinary content. Only the escapes of reserved characters are decoded.
pub fn percent_decode_lenient(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escaped = rest
            .get(pos + 1..pos + 3)
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .map(char::from)
            .filter(|c| PERCENT_RESERVED.contains(c));
        match escaped {
            Some(c) => {
                out.push(c);
                rest = &rest[pos + 3..];
            }
            None => {
                out.push('%');
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}
