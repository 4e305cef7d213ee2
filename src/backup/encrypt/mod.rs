pub mod age;
pub mod passphrase;

use crate::backup::function_path;
use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddFunctionName;
use function_name::named;
use std::fs::File;
use std::io::{BufReader, BufWriter, IntoInnerError, Read};
use std::path::{Path, PathBuf};

/// Suffix appended to an artifact once it is encrypted
pub static ENCRYPTED_FILE_EXT: &str = "age";

/// `<artifact>.age` next to `plaintext`
pub fn encrypted_sibling<P: AsRef<Path>>(plaintext: P) -> PathBuf {
    let mut name = plaintext.as_ref().as_os_str().to_owned();
    name.push(".");
    name.push(ENCRYPTED_FILE_EXT);
    PathBuf::from(name)
}

/// Encrypts `plaintext` into its `.age` sibling and returns the sibling path.
///
/// The plaintext is never removed here. A partially written sibling is removed
/// on failure. Whether encryption worked is decided by the sibling existing
/// afterwards, not by the writer reporting success.
#[named]
pub fn encrypt_file<P: AsRef<Path>>(plaintext: P, passphrase: &RedactedString) -> Result<PathBuf> {
    let plaintext = plaintext.as_ref();
    if passphrase.is_empty() {
        return Err(Error::passphrase_missing(
            "resolved passphrase",
            "passphrase is empty",
        ));
    }
    if !plaintext.is_file() {
        return Err(Error::encryption_verification(
            plaintext,
            "plaintext artifact not found before encryption",
        ));
    }

    let reader = File::open(plaintext)
        .map(BufReader::new)
        .map_err(|e| Error::encryption_verification(plaintext, e.to_string()))
        .add_fn_name(function_path!())?;
    let target = encrypted_sibling(plaintext);
    tracing::info!("Encrypting {:?} -> {:?}", plaintext, target);
    write_encrypted_file(reader, &target, passphrase)?;
    Ok(target)
}

/// Streams `reader` into a new file at `target`, never replacing an existing
/// one. A partially written `target` is removed; every failure is reported as
/// `EncryptionVerification`.
#[named]
fn write_encrypted_file<R: Read>(
    reader: R,
    target: &Path,
    passphrase: &RedactedString,
) -> Result<()> {
    let out = File::create_new(target)
        .map_err(|e| Error::encryption_verification(target, e.to_string()))
        .add_fn_name(function_path!())?;
    if let Err(e) = write_encrypted(reader, out, passphrase) {
        if let Err(rm_err) = std::fs::remove_file(target) {
            tracing::warn!("Removing partial {:?} failed: {}", target, rm_err);
        }
        return Err(
            Error::encryption_verification(target, e.to_string()).add_fn_name(function_path!())
        );
    }

    if !target.is_file() {
        return Err(Error::encryption_verification(
            target,
            "encrypted artifact not found after encryption",
        ));
    }
    Ok(())
}

fn write_encrypted<R: Read>(mut reader: R, out: File, passphrase: &RedactedString) -> Result<()> {
    let mut writer = age::build_encryptor(passphrase, BufWriter::new(out))?;
    std::io::copy(&mut reader, &mut writer)?;
    writer
        .finish()?
        .into_inner()
        .map_err(IntoInnerError::into_error)?
        .sync_all()?;
    Ok(())
}
