use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use cryptocompat_command::RunError;

/// SHA family members accepted by `-a`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Algorithm {
    #[default]
    Sha1,
    Sha2_224,
    Sha2_256,
    Sha2_384,
    Sha2_512,
}

impl Algorithm {
    /// Usage fragment listing every accepted name.
    pub const CHOICES: &'static str = "sha1|sha2-224|sha2-256|sha2-384|sha2-512";

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha1" => Some(Self::Sha1),
            "sha2-224" => Some(Self::Sha2_224),
            "sha2-256" => Some(Self::Sha2_256),
            "sha2-384" => Some(Self::Sha2_384),
            "sha2-512" => Some(Self::Sha2_512),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha2_224 => "sha2-224",
            Self::Sha2_256 => "sha2-256",
            Self::Sha2_384 => "sha2-384",
            Self::Sha2_512 => "sha2-512",
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha2_224 => Sha224::digest(data).to_vec(),
            Self::Sha2_256 => Sha256::digest(data).to_vec(),
            Self::Sha2_384 => Sha384::digest(data).to_vec(),
            Self::Sha2_512 => Sha512::digest(data).to_vec(),
        }
    }

    pub fn hmac(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, RunError> {
        match self {
            Self::Sha1 => mac::<Hmac<Sha1>>(key, data),
            Self::Sha2_224 => mac::<Hmac<Sha224>>(key, data),
            Self::Sha2_256 => mac::<Hmac<Sha256>>(key, data),
            Self::Sha2_384 => mac::<Hmac<Sha384>>(key, data),
            Self::Sha2_512 => mac::<Hmac<Sha512>>(key, data),
        }
    }

    /// PBKDF2 with HMAC over this algorithm, filling `out`.
    pub fn pbkdf2(self, password: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) {
        match self {
            Self::Sha1 => pbkdf2::pbkdf2_hmac::<Sha1>(password, salt, rounds, out),
            Self::Sha2_224 => pbkdf2::pbkdf2_hmac::<Sha224>(password, salt, rounds, out),
            Self::Sha2_256 => pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, rounds, out),
            Self::Sha2_384 => pbkdf2::pbkdf2_hmac::<Sha384>(password, salt, rounds, out),
            Self::Sha2_512 => pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, rounds, out),
        }
    }
}

fn mac<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, RunError> {
    let mut mac = <M as KeyInit>::new_from_slice(key)
        .map_err(|e| RunError::Param(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
