//! Content fingerprints of module configurations.
//!
//! A fingerprint is a SHA-256 digest over a canonical byte encoding: every
//! value is written as a kind tag followed by a length-prefixed payload, and
//! floats are hashed by their bit pattern. Two configurations with equal
//! content therefore always hash alike, independent of the instances holding
//! them.
//!
//! Collisions are not guarded against: the cache does not keep the original
//! inputs next to a result, so two distinct configurations sharing a digest
//! would share cached results. With a 256-bit digest this is an accepted risk.
use crate::value::{Value, ValueBag};
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 bytes as hex, enough to tell fingerprints apart in logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

/// Incremental builder for a [`Fingerprint`].
pub(crate) struct Fingerprinter {
    hasher: Sha256,
}

impl Fingerprinter {
    /// `domain` separates digests of different purposes (module vs. call).
    pub fn new(domain: &str) -> Self {
        let mut fp = Self { hasher: Sha256::new() };
        fp.write_str(domain);
        fp
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_len(s.len());
        self.hasher.update(s.as_bytes());
    }

    pub fn write_tag(&mut self, tag: u8) {
        self.hasher.update([tag]);
    }

    pub fn write_fingerprint(&mut self, fingerprint: &Fingerprint) {
        self.hasher.update(fingerprint.as_bytes());
    }

    pub fn write_value(&mut self, value: &Value) {
        self.write_tag(value.kind().tag());
        match value {
            Value::Bool(b) => self.write_tag(u8::from(*b)),
            Value::Int(i) => self.hasher.update(i.to_le_bytes()),
            Value::Float(x) => self.hasher.update(x.to_bits().to_le_bytes()),
            Value::Str(s) => self.write_str(s),
            Value::Series(series) => {
                self.write_len(series.len());
                for x in series.iter() {
                    self.hasher.update(x.to_bits().to_le_bytes());
                }
            }
            Value::List(items) => {
                self.write_len(items.len());
                for item in items {
                    self.write_value(item);
                }
            }
            Value::Map(map) => {
                self.write_len(map.len());
                for (key, item) in map {
                    self.write_str(key);
                    self.write_value(item);
                }
            }
        }
    }

    pub fn write_bag(&mut self, bag: &ValueBag) {
        self.write_len(bag.len());
        for (name, value) in bag.iter() {
            self.write_str(name);
            self.write_value(value);
        }
    }

    pub fn finish(self) -> Fingerprint {
        Fingerprint(self.hasher.finalize().into())
    }

    fn write_len(&mut self, len: usize) {
        self.hasher.update((len as u64).to_le_bytes());
    }
}

/// Cache key digest for one call: the module's configuration fingerprint, the
/// property type it is run as and the conformed call-time inputs.
pub(crate) fn call_fingerprint(configuration: &Fingerprint, property_type: &str, inputs: &ValueBag) -> Fingerprint {
    let mut fp = Fingerprinter::new("call");
    fp.write_fingerprint(configuration);
    fp.write_str(property_type);
    fp.write_bag(inputs);
    fp.finish()
}
