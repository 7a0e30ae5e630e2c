// Challenge-response login (pre-6.43 scheme).

use md5::{Digest, Md5};

use crate::error::ProtocolError;

/// Computes the `=response=` value for a login challenge:
/// `"00" + hex(md5(0x00 ++ password ++ challenge_bytes))`.
/// The device sends `=ret=` as hex text, so the raw bytes are hashed, not the string.
pub fn challenge_response(password: &str, challenge_hex: &str) -> Result<String, ProtocolError> {
    let challenge = hex::decode(challenge_hex).map_err(|e| ProtocolError::Auth {
        reason: format!("invalid challenge {challenge_hex:?}: {e}"),
    })?;
    let mut hasher = Md5::new();
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    hasher.update(&challenge);
    Ok(format!("00{}", hex::encode(hasher.finalize())))
}
