//! WML deck builders: the built-in health-check deck and the smart-error
//! decks `return_reply` (C5) falls back to when a fetch fails.
//!
//! Grounded on the original's `HEALTH_DECK` macro and the
//! `error_requesting`/`error_requesting_back` helpers (not included in the
//! excerpted source, reconstructed here in the same shape as the health
//! deck per SPEC_FULL §B.3).

const WML_PROLOG: &str = "<?xml version=\"1.0\"?><!DOCTYPE wml PUBLIC \"-//WAPFORUM//DTD 1.1//EN\" \"http://www.wapforum.org/DTD/wml_1.1.xml\">";

/// The fixed health-check deck served for `kannel:alive`.
pub fn health_deck() -> String {
    format!("{WML_PROLOG}<wml><card id=\"health\"><p>Ok</p></card></wml>")
}

/// Error deck with a link back to `referer`.
pub fn requesting_back(referer: &str) -> String {
    format!(
        "{WML_PROLOG}<wml><card id=\"error\"><p>Request failed.</p><p><a href=\"{referer}\">Back</a></p></card></wml>"
    )
}

/// Error deck with no link, for when no referer or device-home URL is known.
pub fn requesting() -> String {
    format!("{WML_PROLOG}<wml><card id=\"error\"><p>Request failed.</p></card></wml>")
}
