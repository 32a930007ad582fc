use sha1::Sha1;
use sha2::digest::Digest;
use sha2::Sha256;

/// Incremental digest accumulator.
///
/// `finalize` is `Sized`-gated so the trait stays object-safe; consumers that
/// only feed bytes (mapping layers) take `&mut dyn Hasher`.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);

    fn finalize(self) -> Vec<u8>
    where
        Self: Sized;
}

pub struct Sha1Hasher(Sha1);

impl Sha1Hasher {
    pub fn new() -> Self {
        Self(Sha1::new())
    }

    pub fn digest(data: &[u8]) -> Vec<u8> {
        Sha1::digest(data).to_vec()
    }
}

impl Default for Sha1Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Sha1Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

pub struct Sha256Hasher(Sha256);

impl Sha256Hasher {
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    pub fn digest(data: &[u8]) -> Vec<u8> {
        Sha256::digest(data).to_vec()
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        let mut hasher = Sha256Hasher::new();
        hasher.update(b"hello world");
        let expected =
            hex::decode("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
                .unwrap();
        assert_eq!(hasher.finalize(), expected);
    }

    #[test]
    fn incremental_equals_oneshot() {
        let mut hasher = Sha1Hasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finalize(), Sha1Hasher::digest(b"hello world"));
    }
}
