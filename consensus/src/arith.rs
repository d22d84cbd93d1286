//! 256-bit proof-of-work targets and the compact `nBits` codec.
//!
//! Targets are unsigned 256-bit magnitudes. Block headers carry them in the
//! lossy "compact" form: the top byte is a base-256 exponent (the byte length
//! of the value), the low 23 bits are the mantissa and bit 23 is a sign flag.
//!
//! ```text
//! bits   = 0xEE_SMMMMM
//! target = MMMMMM * 256^(EE - 3)
//! ```
//!
//! Arithmetic on [`Target`] never wraps. An overflowing multiplication or
//! addition, or an underflowing subtraction, is an internal invariant
//! violation and panics: consensus results must never depend on silently
//! truncated values.

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use primitive_types::{H256, U256, U512};
use serde::{Deserialize, Serialize};

use crate::error::ConsensusError;

/// Sign flag inside the compact mantissa.
const COMPACT_SIGN_BIT: u32 = 0x0080_0000;
/// Mantissa bits of a compact value, excluding the sign flag.
const COMPACT_MANTISSA_MASK: u32 = 0x007f_ffff;

/// Result of decoding compact bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedCompact {
    pub target: Target,
    /// Sign bit set with a nonzero mantissa.
    pub negative: bool,
    /// The encoding describes a value wider than 256 bits.
    pub overflow: bool,
}

impl DecodedCompact {
    /// The target if the encoding is a usable, non-negative, in-range value.
    pub fn valid_target(&self) -> Option<Target> {
        if self.negative || self.overflow || self.target.is_zero() {
            None
        } else {
            Some(self.target)
        }
    }
}

/// Unsigned 256-bit proof-of-work target. Lower target means higher difficulty.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Target(U256);

impl Target {
    pub const ZERO: Target = Target(U256::zero());
    pub const MAX: Target = Target(U256::MAX);

    pub const fn from_u256(value: U256) -> Self {
        Self(value)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Number of significant bits.
    pub fn bits(&self) -> usize {
        self.0.bits()
    }

    /// Interprets a hash in display order (most significant byte first).
    pub fn from_hash(hash: &H256) -> Self {
        Self::from_be_bytes(hash.to_fixed_bytes())
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(U256::from_big_endian(&bytes))
    }

    /// Interprets bytes in wire order (least significant byte first), the
    /// layout hashes have inside serialized headers.
    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        Self(U256::from_little_endian(&bytes))
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0.to_big_endian()
    }

    /// Parses up to 64 hex digits, most significant first. A `0x` prefix is
    /// accepted and short inputs are left-padded with zeros.
    pub fn from_hex(s: &str) -> Result<Self, ConsensusError> {
        let digits = s.trim();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
        if digits.is_empty() || digits.len() > 64 {
            return Err(ConsensusError::InvalidLength {
                expected: 64,
                got: digits.len(),
            });
        }
        let padded = format!("{digits:0>64}");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes)?;
        Ok(Self::from_be_bytes(bytes))
    }

    /// Decodes compact bits, reporting the sign and overflow conditions.
    ///
    /// The returned magnitude ignores the sign flag. Bits shifted beyond the
    /// 256-bit width are discarded; callers must consult `overflow`.
    pub fn from_compact(bits: u32) -> DecodedCompact {
        let size = bits >> 24;
        let mut word = bits & COMPACT_MANTISSA_MASK;
        let target = if size <= 3 {
            word >>= 8 * (3 - size);
            U256::from(word)
        } else {
            U256::from(word) << (8 * (size as usize - 3))
        };
        let negative = word != 0 && bits & COMPACT_SIGN_BIT != 0;
        let overflow = word != 0
            && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));
        DecodedCompact {
            target: Self(target),
            negative,
            overflow,
        }
    }

    /// Encodes as compact bits using the smallest exponent whose mantissa
    /// fits three bytes with the sign bit clear. Low-order bytes beyond the
    /// mantissa are truncated.
    pub fn to_compact(&self) -> u32 {
        let mut size = self.0.bits().div_ceil(8) as u32;
        let mut compact = if size <= 3 {
            (self.0.low_u64() << (8 * (3 - size))) as u32
        } else {
            (self.0 >> (8 * (size as usize - 3))).low_u32()
        };
        if compact & COMPACT_SIGN_BIT != 0 {
            compact >>= 8;
            size += 1;
        }
        compact | (size << 24)
    }

    pub fn checked_mul_u64(self, rhs: u64) -> Option<Self> {
        self.0.checked_mul(U256::from(rhs)).map(Self)
    }

    /// Multiplies by a small factor, panicking on overflow.
    pub fn mul_u64(self, rhs: u64) -> Self {
        match self.checked_mul_u64(rhs) {
            Some(product) => product,
            None => panic!("target multiplication overflow: {self} * {rhs}"),
        }
    }

    /// Integer division by a small divisor. Panics on a zero divisor.
    pub fn div_u64(self, rhs: u64) -> Self {
        Self(self.0 / U256::from(rhs))
    }

    /// `self * mul / div` with a 512-bit intermediate product. A quotient
    /// wider than 256 bits saturates to [`Target::MAX`]. Panics on a zero
    /// divisor.
    pub fn mul_div_u64(self, mul: u64, div: u64) -> Self {
        let product = self.0.full_mul(U256::from(mul));
        let quotient = product / U512::from(div);
        U256::try_from(quotient).map_or(Self::MAX, Self)
    }
}

impl Add for Target {
    type Output = Target;

    fn add(self, rhs: Target) -> Target {
        match self.0.checked_add(rhs.0) {
            Some(sum) => Target(sum),
            None => panic!("target addition overflow: {self} + {rhs}"),
        }
    }
}

impl Sub for Target {
    type Output = Target;

    fn sub(self, rhs: Target) -> Target {
        match self.0.checked_sub(rhs.0) {
            Some(difference) => Target(difference),
            None => panic!("target subtraction underflow: {self} - {rhs}"),
        }
    }
}

impl Mul for Target {
    type Output = Target;

    fn mul(self, rhs: Target) -> Target {
        match self.0.checked_mul(rhs.0) {
            Some(product) => Target(product),
            None => panic!("target multiplication overflow: {self} * {rhs}"),
        }
    }
}

impl Div for Target {
    type Output = Target;

    fn div(self, rhs: Target) -> Target {
        Target(self.0 / rhs.0)
    }
}

impl Mul<u64> for Target {
    type Output = Target;

    fn mul(self, rhs: u64) -> Target {
        self.mul_u64(rhs)
    }
}

impl Div<u64> for Target {
    type Output = Target;

    fn div(self, rhs: u64) -> Target {
        self.div_u64(rhs)
    }
}

impl From<U256> for Target {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<Target> for U256 {
    fn from(value: Target) -> Self {
        value.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_be_bytes()))
    }
}
