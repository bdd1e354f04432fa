//! # Throttle Key Derivation
//!
//! Helpers for building the string key a [`Throttle`](crate::Throttle)
//! counts under. A key combines a logical operation name with a
//! caller-identifying string, typically taken from a forwarded-address
//! header:
//!
//! ```text
//!     "X-Forwarded-For: 1.2.3.4, 10.0.0.1"  +  operation "ai-detect"
//!                 │
//!                 ▼ first entry, trimmed
//!             "1.2.3.4"
//!                 │
//!                 ▼
//!         "ai-detect:1.2.3.4"
//! ```
//!
//! Derivation is deterministic: the same operation and header value always
//! produce the same key, so every instance of a handler counts against the
//! same budget.

/// Sentinel client identifier used when no caller address is available.
///
/// Requests without a forwarded-address header all share one budget per
/// operation, which is the safe default for traffic of unknown origin.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Extracts the caller identifier from a forwarded-address header value.
///
/// Proxies append to the header, so the first comma-separated entry is the
/// original client. The entry is trimmed; an absent header or an empty
/// first entry yields [`UNKNOWN_CLIENT`].
///
/// # Example
///
/// ```rust
/// use throttle::client_from_forwarded;
///
/// assert_eq!(client_from_forwarded(Some("1.2.3.4, 10.0.0.1")), "1.2.3.4");
/// assert_eq!(client_from_forwarded(Some("  1.2.3.4  ")), "1.2.3.4");
/// assert_eq!(client_from_forwarded(None), "unknown");
/// ```
pub fn client_from_forwarded(forwarded: Option<&str>) -> &str {
    forwarded
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|client| !client.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
}

/// Builds the throttle key for an operation and a forwarded-address header.
///
/// The key is `"{operation}:{client}"`, where the client comes from
/// [`client_from_forwarded`].
///
/// # Example
///
/// ```rust
/// use throttle::derive_key;
///
/// assert_eq!(derive_key("ai-detect", Some("1.2.3.4, 10.0.0.1")), "ai-detect:1.2.3.4");
/// assert_eq!(derive_key("ai-detect", None), "ai-detect:unknown");
/// ```
pub fn derive_key(operation: &str, forwarded: Option<&str>) -> String {
    format!("{}:{}", operation, client_from_forwarded(forwarded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_forwarded_entry_wins() {
        assert_eq!(
            client_from_forwarded(Some("1.2.3.4, 10.0.0.1, 10.0.0.2")),
            "1.2.3.4"
        );
    }

    #[test]
    fn test_entry_is_trimmed() {
        assert_eq!(client_from_forwarded(Some("  1.2.3.4 , 10.0.0.1")), "1.2.3.4");
    }

    #[test]
    fn test_missing_header_uses_sentinel() {
        assert_eq!(client_from_forwarded(None), UNKNOWN_CLIENT);
        assert_eq!(client_from_forwarded(Some("")), UNKNOWN_CLIENT);
        assert_eq!(client_from_forwarded(Some("   ")), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_empty_first_entry_uses_sentinel() {
        assert_eq!(client_from_forwarded(Some(" , 10.0.0.1")), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        let a = derive_key("ai-detect", Some("1.2.3.4"));
        let b = derive_key("ai-detect", Some("1.2.3.4, 10.0.0.1"));

        assert_eq!(a, "ai-detect:1.2.3.4");
        assert_eq!(a, b);
    }

    #[test]
    fn test_operations_do_not_collide() {
        let detect = derive_key("ai-detect", Some("1.2.3.4"));
        let tags = derive_key("ai-tags", Some("1.2.3.4"));

        assert_ne!(detect, tags);
    }
}
