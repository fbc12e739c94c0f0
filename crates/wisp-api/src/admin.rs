use sha2::{Digest, Sha256};

/// Holds the shared admin credential that gates public-room management.
///
/// Only a SHA-256 digest is kept; candidates are hashed before comparison so
/// the time taken does not depend on how much of the password matched.
pub struct AdminGate {
    digest: Option<[u8; 32]>,
}

impl AdminGate {
    /// `None` or an empty password disables every admin action.
    pub fn new(password: Option<&str>) -> Self {
        let digest = password
            .filter(|p| !p.is_empty())
            .map(|p| Sha256::digest(p.as_bytes()).into());
        Self { digest }
    }

    pub fn is_enabled(&self) -> bool {
        self.digest.is_some()
    }

    pub fn verify(&self, candidate: &str) -> bool {
        match &self.digest {
            Some(expected) => {
                let actual: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
                actual == *expected
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_configured_password() {
        let gate = AdminGate::new(Some("hunter2"));
        assert!(gate.is_enabled());
        assert!(gate.verify("hunter2"));
        assert!(!gate.verify("hunter3"));
        assert!(!gate.verify(""));
    }

    #[test]
    fn disabled_gate_rejects_everything() {
        for gate in [AdminGate::new(None), AdminGate::new(Some(""))] {
            assert!(!gate.is_enabled());
            assert!(!gate.verify(""));
        }
    }
}
