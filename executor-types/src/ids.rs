// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Opaque 32-byte identifiers and 64-byte signatures shared across the whole
//! pipeline. All of them are plain public-key-shaped byte arrays: the
//! blockchain is the authority on what they mean, this crate only needs to
//! move them around, order them, and hash them deterministically.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! byte_id {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LENGTH: usize = $len;

            pub fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn zero() -> Self {
                Self([0u8; $len])
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }
    };
}

/// Variant of [`byte_id!`] for arrays longer than 32 bytes. `Default`
/// is only implemented by the standard library for arrays up to
/// length 32, and serde's derive has the same ceiling, so both are
/// hand-written here against the same tuple encoding serde's own
/// derive would produce for a small array (no length prefix, one
/// `serialize_element`/`next_element` per byte) so the wire format
/// stays identical to the 32-byte ids above.
macro_rules! byte_id_big {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; $len]);

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $len])
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                use serde::ser::SerializeTuple;
                let mut tup = serializer.serialize_tuple($len)?;
                for byte in &self.0 {
                    tup.serialize_element(byte)?;
                }
                tup.end()
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                struct ArrayVisitor;

                impl<'de> serde::de::Visitor<'de> for ArrayVisitor {
                    type Value = [u8; $len];

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, "an array of {} bytes", $len)
                    }

                    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
                    where
                        A: serde::de::SeqAccess<'de>,
                    {
                        let mut out = [0u8; $len];
                        for (i, slot) in out.iter_mut().enumerate() {
                            *slot = seq.next_element()?.ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                        }
                        Ok(out)
                    }
                }

                deserializer.deserialize_tuple($len, ArrayVisitor).map($name)
            }
        }

        impl $name {
            pub const LENGTH: usize = $len;

            pub fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn zero() -> Self {
                Self([0u8; $len])
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }
    };
}

byte_id!(ContractKey, 32);
byte_id!(DriveKey, 32);
byte_id!(ExecutorKey, 32);
byte_id!(CallerKey, 32);
byte_id!(CallId, 32);
byte_id!(ModificationId, 32);
byte_id!(StorageHash, 32);
byte_id!(TransactionHash, 32);
byte_id!(BlockHash, 32);
byte_id_big!(Signature, 64);

/// A mosaic (fungible asset) identifier, used by `ServicePayment`.
pub type MosaicId = u64;

/// Height of a block as observed by the blockchain client.
pub type BlockHeight = u64;

/// Index of a batch; strictly monotonic and gap-free once emitted.
pub type BatchIndex = u64;
