//! Invoking user's credential and privilege drop.
//!
//! The locker is installed setuid/setgid so it can read the shadow file.
//! Startup resolves the real user's hash once, then drops back to the real
//! uid/gid before the display is even opened. Any lookup failure is fatal.

use std::path::Path;

use nix::unistd::{User, getgid, getuid, setgid, setuid};
use scrlock_core::{CredentialVerifier, Verdict};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::CredentialError;

/// Default shadow database.
pub const SHADOW_PATH: &str = "/etc/shadow";

/// Checks attempts against a crypt(3) hash.
pub struct HashVerifier {
    hash: Zeroizing<String>,
}

impl HashVerifier {
    /// Verifier for `hash`.
    ///
    /// # Errors
    ///
    /// [`CredentialError::UnusableHash`] if the hash is empty, locked
    /// (`!`/`*` prefix) or in a scheme [`pwhash`] cannot check (yescrypt,
    /// gost-yescrypt, scrypt, ...). Such an account could never unlock.
    pub fn new(user: &str, hash: Zeroizing<String>) -> Result<Self, CredentialError> {
        if !checkable(&hash) {
            let scheme = hash.split('$').nth(1).filter(|_| hash.starts_with('$'));
            warn!(user, scheme, "password hash scheme cannot be verified");
            return Err(CredentialError::UnusableHash { user: user.to_owned() });
        }
        Ok(Self { hash })
    }
}

/// crypt(3) prefixes [`pwhash::unix::verify`] understands.
const SCHEMES: [&str; 6] = ["$1$", "$5$", "$6$", "$2a$", "$2b$", "$2y$"];

/// Whether `hash` is in a scheme the verifier can check.
///
/// Traditional DES hashes have no prefix: 13 characters from `./0-9A-Za-z`.
fn checkable(hash: &str) -> bool {
    let des = hash.len() == 13
        && hash.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'/');
    des || SCHEMES.iter().any(|prefix| hash.starts_with(prefix))
}

impl CredentialVerifier for HashVerifier {
    fn verify(&self, attempt: &[u8]) -> Verdict {
        // pwhash returns false for malformed hashes.
        if pwhash::unix::verify(attempt, &self.hash) { Verdict::Accepted } else { Verdict::Rejected }
    }
}

impl std::fmt::Debug for HashVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashVerifier").finish_non_exhaustive()
    }
}

/// Resolve the real user's hash from passwd, falling back to `shadow_path`.
pub fn invoking_user_verifier(shadow_path: &Path) -> Result<HashVerifier, CredentialError> {
    let uid = getuid();
    let user = User::from_uid(uid)?.ok_or(CredentialError::NoPasswdEntry { uid: uid.as_raw() })?;

    let passwd = user
        .passwd
        .to_str()
        .map_err(|_| CredentialError::UnusableHash { user: user.name.clone() })?;

    let hash = if passwd.starts_with('$') {
        Zeroizing::new(passwd.to_owned())
    } else {
        // "x" or another placeholder: the real hash lives in shadow.
        debug!(user = %user.name, "resolving shadow entry");
        shadow_hash(shadow_path, &user.name)?
    };

    HashVerifier::new(&user.name, hash)
}

/// Hash field of `user`'s entry in a shadow-format file.
pub fn shadow_hash(path: &Path, user: &str) -> Result<Zeroizing<String>, CredentialError> {
    let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|source| {
        CredentialError::ShadowUnreadable { path: path.to_path_buf(), source }
    })?);

    contents
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, ':');
            Some((fields.next()?, fields.next()?))
        })
        .find(|(name, _)| *name == user)
        .map(|(_, hash)| Zeroizing::new(hash.to_owned()))
        .ok_or_else(|| CredentialError::NoShadowEntry { user: user.to_owned() })
}

/// Drop setuid/setgid privileges back to the real ids. Group first, since
/// changing the uid first would forfeit the right to change the group.
pub fn drop_privileges() -> Result<(), CredentialError> {
    setgid(getgid()).map_err(CredentialError::DropPrivileges)?;
    setuid(getuid()).map_err(CredentialError::DropPrivileges)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn shadow_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn finds_user_entry() {
        let file = shadow_file("root:!:19000:0:99999:7:::\nalice:$6$abc$def:19000:0:99999:7:::\n");
        let hash = shadow_hash(file.path(), "alice").unwrap();
        assert_eq!(hash.as_str(), "$6$abc$def");
    }

    #[test]
    fn missing_user_is_an_error() {
        let file = shadow_file("root:!:19000::::::\n");
        assert!(matches!(
            shadow_hash(file.path(), "bob"),
            Err(CredentialError::NoShadowEntry { user }) if user == "bob"
        ));
    }

    #[test]
    fn prefix_names_do_not_match() {
        let file = shadow_file("alice2:$6$x$y:::\n");
        assert!(shadow_hash(file.path(), "alice").is_err());
    }

    #[test]
    fn unreadable_shadow_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            shadow_hash(&dir.path().join("missing"), "alice"),
            Err(CredentialError::ShadowUnreadable { .. })
        ));
    }

    #[test]
    fn locked_and_empty_hashes_are_refused() {
        for hash in ["", "!", "!$6$x$y", "*"] {
            assert!(HashVerifier::new("alice", Zeroizing::new(hash.to_owned())).is_err(), "{hash:?}");
        }
    }

    #[test]
    fn unverifiable_schemes_refuse_to_lock() {
        // "secret" under libxcrypt's yescrypt, the default on current distros.
        let yescrypt = "$y$j9T$F5Jx5fExrKuPp53xLKQ..1$GmcwIgvdUC9qLWcKCi6gklUa1dM3ziD43YxYNURLKy0";
        for hash in [yescrypt, "$gy$j9T$abc$def", "$7$CU..../....abc$def", "$argon2id$v=19$x"] {
            assert!(
                matches!(
                    HashVerifier::new("alice", Zeroizing::new(hash.to_owned())),
                    Err(CredentialError::UnusableHash { user }) if user == "alice"
                ),
                "{hash}"
            );
        }
    }

    #[test]
    fn supported_schemes_are_accepted() {
        let md5 = pwhash::md5_crypt::hash("secret").unwrap();
        let sha256 = pwhash::sha256_crypt::hash("secret").unwrap();
        let bcrypt = pwhash::bcrypt::hash("secret").unwrap();
        let des = pwhash::unix_crypt::hash("secret").unwrap();
        for hash in [md5, sha256, bcrypt, des] {
            let verifier = HashVerifier::new("alice", Zeroizing::new(hash.clone())).unwrap();
            assert_eq!(verifier.verify(b"secret"), Verdict::Accepted, "{hash}");
        }
    }

    #[test]
    fn verifies_crypt_hash() {
        let hash = pwhash::sha512_crypt::hash("secret").unwrap();
        let verifier = HashVerifier::new("alice", Zeroizing::new(hash)).unwrap();
        assert_eq!(verifier.verify(b"secret"), Verdict::Accepted);
        assert_eq!(verifier.verify(b"Secret"), Verdict::Rejected);
        assert_eq!(verifier.verify(b""), Verdict::Rejected);
    }

    #[test]
    fn malformed_hash_fails_closed() {
        let verifier = HashVerifier::new("alice", Zeroizing::new("$6$broken".to_owned())).unwrap();
        assert_eq!(verifier.verify(b"anything"), Verdict::Rejected);
    }
}
