//! Recipient address normalization.

/// Server part of a direct-message address.
const USER_SERVER: &str = "s.whatsapp.net";

/// Normalize a recipient into a full network address.
///
/// A bare phone number maps to `<number>@s.whatsapp.net`. Anything that
/// already carries a server suffix (direct, group, broadcast) passes
/// through untouched. Validity of the number itself is the gateway's
/// concern, not ours.
pub fn normalize_recipient(input: &str) -> String {
    if input.contains('@') {
        input.to_string()
    } else {
        format!("{input}@{USER_SERVER}")
    }
}
