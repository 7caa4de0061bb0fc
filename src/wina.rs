//! WINA push-application-id and bearer-indication registries, used by
//! [`crate::headers`] to decode push-session headers (C3).
//!
//! These are the well-known values assigned by the WAP push OTA
//! specification; unknown codes are rejected by the caller, not here.

/// Translates a numeric WINA push-application id to its registered name.
pub fn application_id_to_name(id: u32) -> Option<&'static str> {
    Some(match id {
        0x00 => "wml ua",
        0x01 => "wta ua",
        0x02 => "mms ua",
        0x03 => "push sia",
        0x04 => "push syncml",
        0x05 => "loc",
        0x06 => "syncml dm",
        0x07 => "drm ua",
        0x08 => "emn ua",
        0x09 => "wv ua",
        _ => return None,
    })
}

/// Translates a single-byte bearer-indication value to its registered name.
/// `0` is reserved and rejected, matching the WAP push OTA registry.
pub fn bearer_indication_to_name(value: u8) -> Option<&'static str> {
    Some(match value {
        0x01 => "sms",
        0x02 => "csd",
        0x03 => "usdd",
        0x04 => "cdpd",
        0x05 => "dataTac",
        0x06 => "flex",
        0x07 => "server-initiated",
        0x08 => "https",
        0x09 => "http",
        _ => return None,
    })
}
