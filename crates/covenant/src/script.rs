// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Opcodes used by the custody scripts and a builder producing minimal pushes.

/// Push an empty array.
pub const OP_0: u8 = 0x00;
/// The next byte holds the push length.
pub const OP_PUSHDATA1: u8 = 0x4c;
/// The next two bytes hold the push length.
pub const OP_PUSHDATA2: u8 = 0x4d;
/// The next four bytes hold the push length.
pub const OP_PUSHDATA4: u8 = 0x4e;
/// Push the number -1.
pub const OP_1NEGATE: u8 = 0x4f;
/// Push the number 1.
pub const OP_1: u8 = 0x51;
/// Push the number 16.
pub const OP_16: u8 = 0x60;
/// Conditional branch.
pub const OP_IF: u8 = 0x63;
/// Alternative branch.
pub const OP_ELSE: u8 = 0x67;
/// End of a conditional.
pub const OP_ENDIF: u8 = 0x68;
/// Drop the top stack item.
pub const OP_DROP: u8 = 0x75;
/// Duplicate the top stack item.
pub const OP_DUP: u8 = 0x76;
/// Equality check.
pub const OP_EQUAL: u8 = 0x87;
/// Equality check followed by verify.
pub const OP_EQUALVERIFY: u8 = 0x88;
/// RIPEMD160(SHA256(x)).
pub const OP_HASH160: u8 = 0xa9;
/// Single signature check.
pub const OP_CHECKSIG: u8 = 0xac;
/// m-of-n signature check.
pub const OP_CHECKMULTISIG: u8 = 0xae;
/// Relative lock-time check (BIP112).
pub const OP_CHECKSEQUENCEVERIFY: u8 = 0xb2;

/// Maximum size of a redeem script, bounded by the maximum push size.
pub const MAX_REDEEM_SCRIPT_SIZE: usize = 520;

/// Accumulates script bytes.
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    bytes: Vec<u8>,
}

impl ScriptBuilder {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw opcode.
    pub fn push_opcode(mut self, opcode: u8) -> Self {
        self.bytes.push(opcode);
        self
    }

    /// Appends a number, using the small-integer opcodes where possible.
    pub fn push_int(self, n: i64) -> Self {
        match n {
            0 => self.push_opcode(OP_0),
            -1 => self.push_opcode(OP_1NEGATE),
            1..=16 => self.push_opcode(OP_1 + (n as u8) - 1),
            _ => self.push_data(&encode_script_num(n)),
        }
    }

    /// Appends a data push with the shortest length prefix.
    pub fn push_data(mut self, data: &[u8]) -> Self {
        let len = data.len();
        if len < OP_PUSHDATA1 as usize {
            self.bytes.push(len as u8);
        } else if len <= 0xff {
            self.bytes.push(OP_PUSHDATA1);
            self.bytes.push(len as u8);
        } else if len <= 0xffff {
            self.bytes.push(OP_PUSHDATA2);
            self.bytes.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.bytes.push(OP_PUSHDATA4);
            self.bytes.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.bytes.extend_from_slice(data);
        self
    }

    /// Returns the script bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Minimal little-endian sign-magnitude encoding of a script number.
fn encode_script_num(n: i64) -> Vec<u8> {
    if n == 0 {
        return Vec::new();
    }
    let negative = n < 0;
    let mut abs = n.unsigned_abs();
    let mut out = Vec::new();
    while abs > 0 {
        out.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    let last = out.len() - 1;
    if out[last] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        out[last] |= 0x80;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ints_use_opcodes() {
        let script = ScriptBuilder::new().push_int(0).push_int(7).push_int(16).into_bytes();
        assert_eq!(script, vec![OP_0, 0x57, OP_16]);
    }

    #[test]
    fn script_numbers_are_minimal() {
        assert_eq!(encode_script_num(17), vec![0x11]);
        assert_eq!(encode_script_num(128), vec![0x80, 0x00]);
        assert_eq!(encode_script_num(2016), vec![0xe0, 0x07]);
        assert_eq!(encode_script_num(-5), vec![0x85]);
    }

    #[test]
    fn long_pushes_get_a_length_prefix() {
        let data = vec![0xab; 300];
        let script = ScriptBuilder::new().push_data(&data).into_bytes();
        assert_eq!(&script[..3], &[OP_PUSHDATA2, 0x2c, 0x01]);
        assert_eq!(script.len(), 303);

        let script = ScriptBuilder::new().push_data(&[0x01; 80]).into_bytes();
        assert_eq!(&script[..2], &[OP_PUSHDATA1, 80]);
    }
}
