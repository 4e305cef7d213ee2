//! age passphrase (scrypt) encryption of finished archives.

use crate::backup::redacted::RedactedString;
use crate::backup::result_error::result::Result;
use ::age::secrecy::SecretString;
use ::age::stream::StreamWriter;
use std::io::Write;

/// Wraps `writer` so that everything written to it is age-encrypted with
/// `passphrase`. The returned writer must be `finish`ed to emit the final
/// chunk.
pub fn build_encryptor<W: Write>(passphrase: &RedactedString, writer: W) -> Result<StreamWriter<W>> {
    tracing::debug!("Initializing age encryption with passphrase");
    let secret = SecretString::from(passphrase.inner().clone());
    Ok(::age::Encryptor::with_user_passphrase(secret).wrap_output(writer)?)
}

#[cfg(test)]
pub(crate) fn decrypt_file<P: AsRef<std::path::Path>>(
    path: P,
    passphrase: &RedactedString,
) -> Vec<u8> {
    use std::io::Read;

    let identity = ::age::scrypt::Identity::new(SecretString::from(passphrase.inner().clone()));
    let file = std::fs::File::open(path).unwrap();
    let decryptor = ::age::Decryptor::new(std::io::BufReader::new(file)).unwrap();
    let mut reader = decryptor
        .decrypt(std::iter::once(&identity as &dyn ::age::Identity))
        .unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    out
}
