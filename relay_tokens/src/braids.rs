use aliri_braid::braid;
use std::fmt;

macro_rules! limited_reveal {
    ($ty:ty: $hidden:literal, $default:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    f.write_str("\"")?;
                    limited_reveal(&self.0, &mut *f, $default)?;
                    f.write_str("\"")
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    limited_reveal(&self.0, &mut *f, usize::MAX)
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }
    };
}

/// Writes at most `max_len` characters of a secret, marking truncation with `…`
fn limited_reveal(secret: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        return f.write_str("…");
    }

    if secret.chars().count() <= max_len {
        return f.write_str(secret);
    }

    match secret.char_indices().nth(max_len - 1) {
        Some((idx, _)) => {
            f.write_str(&secret[..idx])?;
            f.write_str("…")
        }
        None => f.write_str(secret),
    }
}

/// The identifier of an upstream application
///
/// Doubles as the scope of every credential issued to that application.
#[braid(serde)]
pub struct AppId;

/// The secret an application presents to the issuer
#[braid(serde, debug = "owned", display = "owned")]
pub struct AppSecret;

limited_reveal!(AppSecretRef: "APP SECRET", 4);

/// An opaque credential value: an access token or a ticket
///
/// An empty value is never a usable credential.
#[braid(serde, debug = "owned", display = "owned")]
pub struct CredentialValue;

limited_reveal!(CredentialValueRef: "CREDENTIAL", 12);

impl CredentialValueRef {
    /// Whether this value holds nothing
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A key in the shared credential store
#[braid(serde)]
pub struct StoreKey;

/// The prefix that separates this system's keys from everything else in the store
#[braid(serde)]
pub struct Namespace;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_values_are_redacted_by_default() {
        let value = CredentialValue::from_static("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(format!("{:?}", value), "***CREDENTIAL***");
        assert_eq!(format!("{}", value), "***CREDENTIAL***");
    }

    #[test]
    fn alternate_debug_reveals_a_bounded_prefix() {
        let value = CredentialValue::from_static("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(format!("{:#?}", value), "\"abcdefghijk…\"");
        assert_eq!(format!("{:#4?}", value), "\"abc…\"");
    }

    #[test]
    fn secrets_that_fit_the_width_are_not_truncated() {
        let value = CredentialValue::from_static("abcd");
        assert_eq!(format!("{:#4?}", value), "\"abcd\"");
        assert_eq!(format!("{:#5?}", value), "\"abcd\"");
        assert_eq!(format!("{:#3?}", value), "\"ab…\"");
    }

    #[test]
    fn short_secrets_are_revealed_whole_on_request() {
        let secret = AppSecret::from_static("abc");
        assert_eq!(format!("{:#?}", secret), "\"abc\"");
        assert_eq!(format!("{:#}", secret), "abc");
    }

    #[test]
    fn empty_value_is_empty() {
        assert!(CredentialValue::from_static("").is_empty());
        assert!(!CredentialValue::from_static("T1").is_empty());
    }
}
