//! Request canonicalization and HMAC-SHA256 signing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;

/// API key pair. The secret never shows up in `Debug` output.
#[derive(Clone, Default)]
pub struct Credentials {
    pub api_key: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_empty() || self.secret_key.is_empty()
    }

    /// Canonicalize `params`, stamp and sign them.
    pub fn sign_params(&self, mut params: BTreeMap<String, String>, timestamp_ms: i64) -> SignedRequest {
        params.insert("timestamp".to_string(), timestamp_ms.to_string());
        let query = canonical_query(&params);
        let signature = sign(&query, &self.secret_key);
        SignedRequest {
            query,
            signature,
            timestamp_ms,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// `key=value` pairs joined by `&`, keys in lexicographic order.
///
/// Values are used raw; the signature covers exactly the bytes sent.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Lowercase hex HMAC-SHA256 of `payload`.
pub fn sign(payload: &str, secret_key: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret_key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub query: String,
    pub signature: String,
    pub timestamp_ms: i64,
}

impl SignedRequest {
    /// `base + path + "?" + query + "&signature=" + signature`
    pub fn url(&self, base: &str, path: &str) -> String {
        format!("{}{}?{}&signature={}", base, path, self.query, self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_canonical_query_sorts_keys() {
        let p = params(&[("symbol", "BTC-USDT"), ("side", "BUY"), ("quantity", "0.0004")]);
        assert_eq!(canonical_query(&p), "quantity=0.0004&side=BUY&symbol=BTC-USDT");
    }

    #[test]
    fn test_known_hmac_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            sign("what do ya want for nothing?", "Jefe"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_signature_is_deterministic() {
        let creds = Credentials::new("key", "secret");
        let p = params(&[("symbol", "ETH-USDT")]);
        let a = creds.sign_params(p.clone(), 1_700_000_000_000);
        let b = creds.sign_params(p, 1_700_000_000_000);
        assert_eq!(a, b);
        assert_eq!(a.signature.len(), 64);
        assert!(a.signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_any_param_change_changes_signature() {
        let creds = Credentials::new("key", "secret");
        let base = creds.sign_params(params(&[("quantity", "1"), ("symbol", "ETH-USDT")]), 1);
        let qty = creds.sign_params(params(&[("quantity", "2"), ("symbol", "ETH-USDT")]), 1);
        let ts = creds.sign_params(params(&[("quantity", "1"), ("symbol", "ETH-USDT")]), 2);
        assert_ne!(base.signature, qty.signature);
        assert_ne!(base.signature, ts.signature);
    }

    #[test]
    fn test_url_layout() {
        let creds = Credentials::new("key", "secret");
        let req = creds.sign_params(BTreeMap::new(), 42);
        let url = req.url("https://open-api-vst.bingx.com", "/openApi/swap/v2/user/balance");
        assert_eq!(
            url,
            format!(
                "https://open-api-vst.bingx.com/openApi/swap/v2/user/balance?timestamp=42&signature={}",
                req.signature
            )
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("visible", "hidden-secret");
        let out = format!("{:?}", creds);
        assert!(out.contains("visible"));
        assert!(!out.contains("hidden-secret"));
    }
}
