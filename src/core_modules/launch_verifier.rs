// THEORY:
// The `LaunchDataVerifier` decides whether an `initData` payload really comes from
// Telegram for this bot. Telegram signs the payload with a key only it and the bot
// owner can derive:
//
//     secret    = SHA256(bot_token)                       (raw 32 bytes)
//     signature = hex(HMAC_SHA256(secret, check_string))  (lowercase)
//
// where the check-string is the payload's fields minus `hash`, sorted by key,
// rendered `key=value` and joined with '\n' (see `LaunchPayload::check_string`).
//
// Key principles:
// 1.  **Fail Closed**: every doubtful case (no token, no hash, a hash that is not a
//     lowercase hex digest, a mismatch) rejects. Nothing here panics.
// 2.  **Loud Misconfiguration**: a missing bot token means every login will be
//     refused. That is reported once per process at error level, not once per call.
// 3.  **Stateless**: the derived secret is the only state; `verify` takes `&self`
//     and can be called from any number of threads at once.
//
// The supplied hash is compared in constant time against the computed digest. Since
// the hash must already be 64 lowercase hex characters, this accepts exactly the
// strings equal to the hex-encoded HMAC.

use std::fmt;
use std::sync::Once;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::{debug, error};

use crate::core_modules::launch_data::LaunchPayload;
use crate::error::VerificationError;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded SHA-256 digest.
const HEX_DIGEST_LEN: usize = 64;

static MISSING_TOKEN_REPORTED: Once = Once::new();

fn report_missing_token() {
    MISSING_TOKEN_REPORTED.call_once(|| {
        error!("BOT_TOKEN is not configured; every launch payload will be rejected");
    });
}

/// Derives the HMAC key from a bot token.
pub fn secret_key(bot_token: &str) -> [u8; 32] {
    let digest = Sha256::digest(bot_token.as_bytes());
    let mut secret = [0u8; 32];
    secret.copy_from_slice(&digest);
    secret
}

fn keyed_mac(secret: &[u8; 32]) -> Result<HmacSha256, VerificationError> {
    // HMAC takes keys of any length; this cannot fail for a 32-byte key
    HmacSha256::new_from_slice(secret).map_err(|_| VerificationError::MissingToken)
}

/// Decodes a lowercase hex SHA-256 digest.
fn decode_digest(hash: &str) -> Result<Vec<u8>, VerificationError> {
    let well_formed = hash.len() == HEX_DIGEST_LEN
        && hash
            .bytes()
            .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte));
    if !well_formed {
        return Err(VerificationError::MalformedHash);
    }
    hex::decode(hash).map_err(|_| VerificationError::MalformedHash)
}

/// Checks launch payloads against one bot's token.
#[derive(Clone)]
pub struct LaunchDataVerifier {
    secret: Option<[u8; 32]>,
}

impl fmt::Debug for LaunchDataVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchDataVerifier")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl LaunchDataVerifier {
    /// A verifier for `bot_token`. An empty token yields a verifier that rejects
    /// everything (and reports the misconfiguration once).
    pub fn new(bot_token: &str) -> Self {
        if bot_token.is_empty() {
            report_missing_token();
            return Self { secret: None };
        }
        Self {
            secret: Some(secret_key(bot_token)),
        }
    }

    pub fn from_optional(bot_token: Option<&str>) -> Self {
        Self::new(bot_token.unwrap_or_default())
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// The hash Telegram would attach to `payload` for this bot.
    pub fn sign(&self, payload: &LaunchPayload) -> Result<String, VerificationError> {
        let secret = self.secret.as_ref().ok_or(VerificationError::MissingToken)?;
        let mut mac = keyed_mac(secret)?;
        mac.update(payload.check_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Verifies `payload` against its own `hash` field, with the rejection reason.
    pub fn check(&self, payload: &LaunchPayload) -> Result<(), VerificationError> {
        let hash = payload.hash().ok_or(VerificationError::MissingHash)?;
        self.check_hash(payload, hash)
    }

    /// Verifies `payload` against an externally supplied hash.
    pub fn check_hash(&self, payload: &LaunchPayload, hash: &str) -> Result<(), VerificationError> {
        let secret = self.secret.as_ref().ok_or(VerificationError::MissingToken)?;
        let expected = decode_digest(hash)?;
        let mut mac = keyed_mac(secret)?;
        mac.update(payload.check_string().as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| VerificationError::SignatureMismatch)
    }

    pub fn verify(&self, payload: &LaunchPayload) -> bool {
        match self.check(payload) {
            Ok(()) => true,
            Err(reason) => {
                debug!(%reason, "launch payload rejected");
                false
            }
        }
    }
}

/// One-shot verification of `payload` against `hash` for `bot_token`.
pub fn verify(payload: &LaunchPayload, hash: &str, bot_token: &str) -> bool {
    LaunchDataVerifier::new(bot_token)
        .check_hash(payload, hash)
        .is_ok()
}
