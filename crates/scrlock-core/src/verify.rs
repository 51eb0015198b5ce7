//! Credential verification boundary.

/// Outcome of a credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The attempt matches the stored credential
    Accepted,
    /// Anything else, including internal verifier failures
    Rejected,
}

/// Checks a plaintext attempt against the invoking user's credential.
///
/// Implementations must fail closed: any internal error is reported as
/// [`Verdict::Rejected`], never as acceptance.
pub trait CredentialVerifier {
    /// Check `attempt`.
    fn verify(&self, attempt: &[u8]) -> Verdict;
}

impl<V: CredentialVerifier + ?Sized> CredentialVerifier for &V {
    fn verify(&self, attempt: &[u8]) -> Verdict {
        (**self).verify(attempt)
    }
}

impl<V: CredentialVerifier + ?Sized> CredentialVerifier for Box<V> {
    fn verify(&self, attempt: &[u8]) -> Verdict {
        (**self).verify(attempt)
    }
}
