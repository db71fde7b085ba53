// crates/fides-consent-core/src/codec/bits.rs
// ============================================================================
// Module: Bit Writer and Reader
// Description: MSB-first bit packing with fixed-width and Fibonacci integers.
// Purpose: Share one bounds-checked bit layer between the TC and GPP codecs.
// Dependencies: crate::codec
// ============================================================================

//! ## Overview
//! Both IAB formats pack fields most-significant bit first. The writer
//! refuses values that do not fit their width; the reader reports
//! [`DecodeError::Truncated`] instead of reading past the end.
//!
//! Fibonacci integers (GPP header ranges) are Zeckendorf representations
//! written lowest Fibonacci number first and terminated by an extra `1`, so
//! every code ends in `11`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::codec::DecodeError;
use crate::codec::EncodeError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Longest Fibonacci code accepted when decoding.
const MAX_FIBONACCI_BITS: usize = 64;

// ============================================================================
// SECTION: Bit Writer
// ============================================================================

/// Append-only bit buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitWriter {
    /// Bits in write order.
    bits: Vec<bool>,
}

impl BitWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bits: Vec::new(),
        }
    }

    /// Returns the number of bits written.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns true when nothing has been written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Appends one bit.
    pub fn push_bool(&mut self, value: bool) {
        self.bits.push(value);
    }

    /// Appends `value` as a `width`-bit unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::EncodingOverflow`] when `value` needs more than `width` bits.
    pub fn push_int(&mut self, value: u64, width: u32, field: &'static str) -> Result<(), EncodeError> {
        let max = max_for_width(width);
        if value > max {
            return Err(EncodeError::EncodingOverflow {
                field,
                value,
                max,
            });
        }
        for shift in (0 .. width).rev() {
            self.bits.push((value >> shift) & 1 == 1);
        }
        Ok(())
    }

    /// Appends a Fibonacci-coded positive integer.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::InvalidIdentifier`] when `value` is zero.
    pub fn push_fibonacci(&mut self, value: u64, field: &'static str) -> Result<(), EncodeError> {
        if value == 0 {
            return Err(EncodeError::InvalidIdentifier {
                field,
                value: "0".to_string(),
            });
        }
        let mut fibs = vec![1_u64];
        let (mut prev, mut next) = (1_u64, 2_u64);
        while next <= value {
            fibs.push(next);
            let sum = prev.saturating_add(next);
            prev = next;
            next = sum;
        }
        let mut code = vec![false; fibs.len()];
        let mut remaining = value;
        for (index, fib) in fibs.iter().enumerate().rev() {
            if remaining >= *fib {
                code[index] = true;
                remaining -= fib;
            }
        }
        self.bits.extend(code);
        self.bits.push(true);
        Ok(())
    }

    /// Appends every bit of another writer.
    pub fn extend(&mut self, other: &Self) {
        self.bits.extend_from_slice(&other.bits);
    }

    /// Returns the bits packed into bytes, zero-padded to a multiple of `align_bits`.
    ///
    /// `align_bits` must be a multiple of 8; smaller values pad to a byte.
    #[must_use]
    pub fn to_padded_bytes(&self, align_bits: usize) -> Vec<u8> {
        let align = align_bits.max(8);
        let padded_len = self.bits.len().div_ceil(align) * align;
        let mut bytes = vec![0_u8; padded_len / 8];
        for (index, bit) in self.bits.iter().enumerate() {
            if *bit {
                bytes[index / 8] |= 0x80 >> (index % 8);
            }
        }
        bytes
    }
}

/// Returns the largest value representable in `width` bits.
const fn max_for_width(width: u32) -> u64 {
    if width >= 64 { u64::MAX } else { (1_u64 << width) - 1 }
}

// ============================================================================
// SECTION: Bit Reader
// ============================================================================

/// Cursor over packed bits.
#[derive(Debug, Clone)]
pub struct BitReader {
    /// Packed input bytes.
    bytes: Vec<u8>,
    /// Next bit position.
    position: usize,
}

impl BitReader {
    /// Creates a reader over packed bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            position: 0,
        }
    }

    /// Returns the number of unread bits.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        (self.bytes.len() * 8).saturating_sub(self.position)
    }

    /// Reads one bit.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] at end of input.
    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        let byte = self.bytes.get(self.position / 8).ok_or(DecodeError::Truncated {
            field,
        })?;
        let bit = byte & (0x80 >> (self.position % 8)) != 0;
        self.position += 1;
        Ok(bit)
    }

    /// Reads a `width`-bit unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] when fewer than `width` bits remain.
    pub fn read_int(&mut self, width: u32, field: &'static str) -> Result<u64, DecodeError> {
        if self.remaining() < width as usize {
            return Err(DecodeError::Truncated {
                field,
            });
        }
        let mut value = 0_u64;
        for _ in 0 .. width {
            value = (value << 1) | u64::from(self.read_bool(field)?);
        }
        Ok(value)
    }

    /// Reads a fixed-width integer that must fit in `u8`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when input is truncated.
    pub fn read_u8(&mut self, width: u32, field: &'static str) -> Result<u8, DecodeError> {
        let value = self.read_int(width, field)?;
        u8::try_from(value).map_err(|_| DecodeError::InvalidField(field.to_string()))
    }

    /// Reads a fixed-width integer that must fit in `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when input is truncated.
    pub fn read_u16(&mut self, width: u32, field: &'static str) -> Result<u16, DecodeError> {
        let value = self.read_int(width, field)?;
        u16::try_from(value).map_err(|_| DecodeError::InvalidField(field.to_string()))
    }

    /// Reads a fixed-width integer that must fit in `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when input is truncated.
    pub fn read_u32(&mut self, width: u32, field: &'static str) -> Result<u32, DecodeError> {
        let value = self.read_int(width, field)?;
        u32::try_from(value).map_err(|_| DecodeError::InvalidField(field.to_string()))
    }

    /// Reads a Fibonacci-coded positive integer.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the code is truncated or too long.
    pub fn read_fibonacci(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        let (mut fib, mut next) = (1_u64, 2_u64);
        let mut value = 0_u64;
        let mut previous = false;
        for _ in 0 .. MAX_FIBONACCI_BITS {
            let bit = self.read_bool(field)?;
            if bit && previous {
                return Ok(value);
            }
            if bit {
                value = value.saturating_add(fib);
            }
            previous = bit;
            let sum = fib.saturating_add(next);
            fib = next;
            next = sum;
        }
        Err(DecodeError::InvalidField(format!("{field}: fibonacci code too long")))
    }
}
