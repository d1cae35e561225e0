// lzw.rs
//
// Copyright (c) 2020-2025  Douglas Lau
//
//! Lempel-Ziv-Welch decompression for GIF
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::ops::AddAssign;

/// Code Bits
#[derive(Clone, Copy, Debug, PartialEq)]
struct Bits(u8);

impl From<u8> for Bits {
    fn from(bits: u8) -> Self {
        Bits(bits.min(Self::MAX.0))
    }
}

impl From<Bits> for u8 {
    fn from(bits: Bits) -> Self {
        bits.0
    }
}

impl AddAssign<u8> for Bits {
    fn add_assign(&mut self, rhs: u8) {
        self.0 = (self.0 + rhs).min(Self::MAX.0)
    }
}

impl Bits {
    /// Maximum code bits allowed for GIF
    const MAX: Self = Bits(12);

    /// Get the number of entries
    fn entries(self) -> u16 {
        1 << (self.0 as u16)
    }

    /// Get the bit mask
    fn mask(self) -> u32 {
        (1 << (self.0 as u32)) - 1
    }
}

/// Code type
type Code = u16;

/// Node for code dictionary
#[derive(Clone, Copy, Debug)]
struct Node {
    /// Prefix node code
    next: Option<Code>,
    /// Byte value
    byte: u8,
}

/// Code dictionary
#[derive(Debug)]
struct Table {
    /// Table of codes
    nodes: Vec<Node>,
    /// Minimum code bits
    min_code_bits: u8,
}

impl Table {
    /// Create a new code dictionary
    fn new(min_code_bits: u8) -> Self {
        let mut table = Table {
            nodes: Vec::with_capacity(Bits::MAX.entries().into()),
            min_code_bits,
        };
        table.reset();
        table
    }

    /// Get the clear code
    fn clear_code(&self) -> Code {
        1 << self.min_code_bits
    }

    /// Get the end code
    fn end_code(&self) -> Code {
        self.clear_code() + 1
    }

    /// Get the next available code
    fn next_code(&self) -> Code {
        self.nodes.len() as Code
    }

    /// Check if the dictionary has no free codes
    fn is_full(&self) -> bool {
        self.nodes.len() >= Bits::MAX.entries().into()
    }

    /// Reset the dictionary
    fn reset(&mut self) {
        self.nodes.clear();
        for byte in 0..self.clear_code() {
            self.push_node(None, byte as u8);
        }
        self.push_node(None, 0); // clear code
        self.push_node(None, 0); // end code
    }

    /// Push a node into the dictionary
    fn push_node(&mut self, next: Option<Code>, byte: u8) {
        self.nodes.push(Node { next, byte })
    }

    /// Lookup the first byte of a code
    fn lookup(&self, code: Code) -> u8 {
        debug_assert!(code < self.next_code());
        let mut node = self.nodes[code as usize];
        while let Some(code) = node.next {
            node = self.nodes[code as usize];
        }
        node.byte
    }

    /// Decompress a code into a buffer (reversed)
    fn decompress_reversed(&self, code: Code, buffer: &mut Vec<u8>) {
        debug_assert!(code < self.next_code());
        let mut node = self.nodes[code as usize];
        while let Some(code) = node.next {
            buffer.push(node.byte);
            node = self.nodes[code as usize];
        }
        buffer.push(node.byte);
    }
}

/// LZW Data Decompressor
///
/// Bytes can be fed in any number of pieces; codes spanning a piece boundary
/// are held in the bit accumulator until complete.
#[derive(Debug)]
pub struct Decompressor {
    /// Code dictionary
    table: Table,
    /// Minimum code bits
    min_code_bits: u8,
    /// Current code bits
    code_bits: Bits,
    /// Last code
    last: Option<Code>,
    /// Bit accumulator
    code: u32,
    /// Number of bits in accumulator
    n_bits: u8,
    /// End code has been found
    done: bool,
}

impl Decompressor {
    /// Create a new decompressor
    pub fn new(min_code_bits: u8) -> Self {
        Decompressor {
            min_code_bits,
            table: Table::new(min_code_bits),
            code_bits: Bits::from(min_code_bits + 1),
            last: None,
            code: 0,
            n_bits: 0,
            done: false,
        }
    }

    /// Check if the end code has been found
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Get the number of entries in the code dictionary
    pub fn table_len(&self) -> usize {
        self.table.nodes.len()
    }

    /// Get the current code width in bits
    pub fn code_bits(&self) -> u8 {
        self.code_bits.into()
    }

    /// Take one code from the accumulator
    fn code(&mut self) -> Option<Code> {
        let b = u8::from(self.code_bits);
        if self.n_bits >= b {
            let code = (self.code & self.code_bits.mask()) as Code;
            self.code >>= b;
            self.n_bits -= b;
            Some(code)
        } else {
            None
        }
    }

    /// Unpack one code from a buffer
    fn unpack(&mut self, buffer: &[u8]) -> (usize, Option<Code>) {
        let mut n_consumed = 0;
        for byte in buffer {
            if self.n_bits >= self.code_bits.into() {
                break;
            }
            self.code |= (*byte as u32) << self.n_bits;
            self.n_bits += 8;
            n_consumed += 1;
        }
        (n_consumed, self.code())
    }

    /// Decompress a byte buffer, appending color indices.
    ///
    /// Everything after the end code is ignored.
    pub fn decompress(
        &mut self,
        bytes: &[u8],
        buffer: &mut Vec<u8>,
    ) -> Result<()> {
        let mut bytes = bytes;
        while !bytes.is_empty() && !self.done {
            let (consumed, code) = self.unpack(bytes);
            if let Some(code) = code {
                self.decompress_code(code, buffer)?;
            }
            bytes = &bytes[consumed..];
        }
        while !self.done {
            match self.code() {
                Some(code) => self.decompress_code(code, buffer)?,
                None => break,
            }
        }
        Ok(())
    }

    /// Decompress one code
    fn decompress_code(
        &mut self,
        code: Code,
        buffer: &mut Vec<u8>,
    ) -> Result<()> {
        if code == self.table.clear_code() {
            self.table.reset();
            self.code_bits = Bits::from(self.min_code_bits + 1);
            self.last = None;
        } else if code == self.table.end_code() {
            self.done = true;
        } else {
            let start = buffer.len();
            self.decompress_reversed(code, buffer)?;
            buffer[start..].reverse();
            self.last = Some(code);
        }
        Ok(())
    }

    /// Decompress one code (reversed)
    fn decompress_reversed(
        &mut self,
        code: Code,
        buffer: &mut Vec<u8>,
    ) -> Result<()> {
        let next_code = self.table.next_code();
        let full = self.table.is_full();
        let pushed = match (self.last, code.cmp(&next_code)) {
            (_, Ordering::Greater) => return Err(Error::InvalidLzwData),
            (None, _) if code >= self.table.clear_code() => {
                return Err(Error::InvalidLzwData);
            }
            (None, _) => {
                buffer.push(code as u8);
                false
            }
            (Some(_), Ordering::Equal) if full => {
                return Err(Error::InvalidLzwData);
            }
            (Some(last), Ordering::Less) => {
                self.table.decompress_reversed(code, buffer);
                if !full {
                    // first byte of this code is last in reversed order
                    let byte = buffer[buffer.len() - 1];
                    self.table.push_node(Some(last), byte);
                }
                !full
            }
            (Some(last), Ordering::Equal) => {
                let byte = self.table.lookup(last);
                self.table.push_node(Some(last), byte);
                self.table.decompress_reversed(code, buffer);
                true
            }
        };
        if pushed && self.table.next_code() == self.code_bits.entries() {
            self.code_bits += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::pack_codes;

    #[test]
    fn literals() -> Result<()> {
        // clear, 0, 1, 2, end (3 bits)
        let data = pack_codes(&[(4, 3), (0, 3), (1, 3), (2, 3), (5, 4)]);
        let mut dec = Decompressor::new(2);
        let mut buf = vec![];
        dec.decompress(&data, &mut buf)?;
        // 1 adds {0,1}, 2 adds {1,2} and widens to 4 bits
        assert_eq!(buf, [0, 1, 2]);
        assert!(dec.is_done());
        assert_eq!(dec.table_len(), 8);
        assert_eq!(dec.code_bits(), 4);
        Ok(())
    }

    #[test]
    fn kwkwk() -> Result<()> {
        // 1, then code 6 (not yet defined) => {1, 1}
        let data = pack_codes(&[(4, 3), (1, 3), (6, 3), (5, 3)]);
        let mut dec = Decompressor::new(2);
        let mut buf = vec![];
        dec.decompress(&data, &mut buf)?;
        assert_eq!(buf, [1, 1, 1]);
        Ok(())
    }

    #[test]
    fn repeated_strings() -> Result<()> {
        // 6 is {0,1}, 8 is not yet defined so it becomes {0,1,0}
        let data = pack_codes(&[
            (4, 3),
            (0, 3),
            (1, 3),
            (6, 3),
            (8, 4),
            (5, 4),
        ]);
        let mut dec = Decompressor::new(2);
        let mut buf = vec![];
        dec.decompress(&data, &mut buf)?;
        assert_eq!(buf, [0, 1, 0, 1, 0, 1, 0]);
        Ok(())
    }

    #[test]
    fn clear_mid_stream() -> Result<()> {
        let mut dec = Decompressor::new(2);
        let mut buf = vec![];
        let data = pack_codes(&[(4, 3), (0, 3), (1, 3), (2, 3), (3, 4)]);
        dec.decompress(&data, &mut buf)?;
        assert_eq!(dec.table_len(), 9);
        assert_eq!(dec.code_bits(), 4);
        // a fresh decompressor is the baseline after the clear
        let after = [(1, 3), (6, 3), (5, 3)];
        let mut codes = vec![(4, 4)];
        codes.extend_from_slice(&after);
        let mut tail = vec![];
        dec.decompress(&pack_codes(&codes), &mut tail)?;
        let mut base = vec![];
        let mut fresh = Decompressor::new(2);
        let mut codes = vec![(4, 3)];
        codes.extend_from_slice(&after);
        fresh.decompress(&pack_codes(&codes), &mut base)?;
        assert_eq!(tail, base);
        assert_eq!(tail, [1, 1, 1]);
        assert_eq!(dec.table_len(), fresh.table_len());
        assert_eq!(dec.code_bits(), fresh.code_bits());
        Ok(())
    }

    #[test]
    fn clear_resets_table() -> Result<()> {
        let mut dec = Decompressor::new(2);
        let mut buf = vec![];
        // grow table to 4 bit codes, then clear
        let data = pack_codes(&[(4, 3), (0, 3), (1, 3), (2, 3), (4, 4)]);
        dec.decompress(&data, &mut buf)?;
        assert_eq!(dec.table_len(), (1 << 2) + 2);
        assert_eq!(dec.code_bits(), 3);
        assert!(!dec.is_done());
        Ok(())
    }

    #[test]
    fn end_code_stops() -> Result<()> {
        let data = pack_codes(&[(4, 3), (3, 3), (5, 3), (1, 3), (2, 3)]);
        let mut dec = Decompressor::new(2);
        let mut buf = vec![];
        dec.decompress(&data, &mut buf)?;
        assert_eq!(buf, [3]);
        assert!(dec.is_done());
        dec.decompress(&[0xFF], &mut buf)?;
        assert_eq!(buf, [3]);
        Ok(())
    }

    #[test]
    fn split_pieces() -> Result<()> {
        let data = pack_codes(&[(4, 3), (0, 3), (1, 3), (6, 3), (8, 4)]);
        let mut dec = Decompressor::new(2);
        let mut buf = vec![];
        for b in &data {
            dec.decompress(&[*b], &mut buf)?;
        }
        assert_eq!(buf, [0, 1, 0, 1, 0, 1, 0]);
        Ok(())
    }

    #[test]
    fn invalid_codes() {
        let mut buf = vec![];
        // first code after clear must be a literal
        let data = pack_codes(&[(4, 3), (6, 3)]);
        let mut dec = Decompressor::new(2);
        assert!(matches!(
            dec.decompress(&data, &mut buf),
            Err(Error::InvalidLzwData)
        ));
        // code beyond next free code
        let data = pack_codes(&[(4, 3), (0, 3), (7, 3)]);
        let mut dec = Decompressor::new(2);
        assert!(matches!(
            dec.decompress(&data, &mut buf),
            Err(Error::InvalidLzwData)
        ));
    }

    #[test]
    fn width_capped() -> Result<()> {
        let mut codes = vec![(256, 9), (0, 9)];
        let mut bits = 9;
        let mut next = 258;
        // each literal adds one entry until the table is full
        while next < 4096 {
            codes.push((1, bits));
            next += 1;
            if next == 1 << bits && bits < 12 {
                bits += 1;
            }
        }
        codes.push((1, 12));
        codes.push((257, 12));
        let mut dec = Decompressor::new(8);
        let mut buf = vec![];
        dec.decompress(&pack_codes(&codes), &mut buf)?;
        assert_eq!(dec.table_len(), 4096);
        assert_eq!(dec.code_bits(), 12);
        assert!(dec.is_done());
        assert_eq!(buf.len(), codes.len() - 2);
        Ok(())
    }
}
