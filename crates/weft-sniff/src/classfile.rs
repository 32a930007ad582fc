//! Minimal JVM class-file reader.
//!
//! Parses just enough structure to reach one method's Code attribute: the
//! constant pool (strings resolved, everything else skipped) and the method
//! table. Nothing is executed and no external bytecode engine is involved.

use crate::error::{Result, SniffError};

const MAGIC: u32 = 0xCAFE_BABE;

/// A constant pool slot. Only strings matter to the sniffer; every other
/// entry is recorded as `Other` so indices still line up.
#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Str { utf8: u16 },
    Other,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(SniffError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

pub struct ClassFile {
    pool: Vec<Constant>,
    methods: Vec<MethodInfo>,
}

struct MethodInfo {
    name: u16,
    code: Option<Vec<u8>>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        if r.u32()? != MAGIC {
            return Err(SniffError::BadMagic);
        }
        r.skip(4)?; // minor + major version

        let pool = Self::parse_pool(&mut r)?;

        r.skip(6)?; // access flags, this class, super class
        let interfaces = r.u16()? as usize;
        r.skip(interfaces * 2)?;

        // Fields carry no code; skip them wholesale.
        let field_count = r.u16()?;
        for _ in 0..field_count {
            r.skip(6)?;
            Self::skip_attributes(&mut r)?;
        }

        let method_count = r.u16()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            r.skip(2)?; // access flags
            let name = r.u16()?;
            r.skip(2)?; // descriptor
            let mut code = None;
            let attr_count = r.u16()?;
            for _ in 0..attr_count {
                let attr_name = r.u16()?;
                let len = r.u32()? as usize;
                if matches!(pool.get(attr_name as usize), Some(Constant::Utf8(n)) if n == "Code")
                {
                    let body = r.take(len)?;
                    // u2 max_stack, u2 max_locals, u4 code_length, code...
                    if body.len() >= 8 {
                        let code_len =
                            u32::from_be_bytes([body[4], body[5], body[6], body[7]]) as usize;
                        if body.len() >= 8 + code_len {
                            code = Some(body[8..8 + code_len].to_vec());
                        }
                    }
                } else {
                    r.skip(len)?;
                }
            }
            methods.push(MethodInfo { name, code });
        }

        Ok(Self { pool, methods })
    }

    fn parse_pool(r: &mut Reader<'_>) -> Result<Vec<Constant>> {
        let count = r.u16()? as usize;
        let mut pool = vec![Constant::Other; count.max(1)];
        let mut index = 1;
        while index < count {
            let tag = r.u8()?;
            match tag {
                1 => {
                    let len = r.u16()? as usize;
                    let raw = r.take(len)?;
                    let text = String::from_utf8(raw.to_vec())
                        .map_err(|_| SniffError::MalformedUtf8(index as u16))?;
                    pool[index] = Constant::Utf8(text);
                }
                8 => pool[index] = Constant::Str { utf8: r.u16()? },
                7 | 16 | 19 | 20 => r.skip(2)?,
                15 => r.skip(3)?,
                3 | 4 | 9 | 10 | 11 | 12 | 17 | 18 => r.skip(4)?,
                // long/double occupy two pool slots; the second stays unusable
                5 | 6 => {
                    r.skip(8)?;
                    index += 1;
                }
                other => return Err(SniffError::UnknownConstantTag(other)),
            }
            index += 1;
        }
        Ok(pool)
    }

    fn skip_attributes(r: &mut Reader<'_>) -> Result<()> {
        let count = r.u16()?;
        for _ in 0..count {
            r.skip(2)?;
            let len = r.u32()? as usize;
            r.skip(len)?;
        }
        Ok(())
    }

    fn utf8(&self, index: u16) -> Option<&str> {
        match self.pool.get(index as usize) {
            Some(Constant::Utf8(s)) => Some(s),
            _ => None,
        }
    }

    /// Bytecode of the named method's Code attribute, if the method exists
    /// and has one.
    pub fn method_code(&self, name: &str) -> Option<&[u8]> {
        self.methods
            .iter()
            .find(|m| self.utf8(m.name) == Some(name))
            .and_then(|m| m.code.as_deref())
    }

    /// Every string constant loaded by an `ldc`/`ldc_w` instruction in
    /// `code`, in instruction order.
    pub fn loaded_strings(&self, code: &[u8]) -> Result<Vec<&str>> {
        let mut out = Vec::new();
        let mut pc = 0usize;
        while pc < code.len() {
            let op = code[pc];
            let index = match op {
                0x12 => Some(*code.get(pc + 1).ok_or(SniffError::Truncated(pc))? as u16),
                0x13 => {
                    let hi = *code.get(pc + 1).ok_or(SniffError::Truncated(pc))?;
                    let lo = *code.get(pc + 2).ok_or(SniffError::Truncated(pc))?;
                    Some(u16::from_be_bytes([hi, lo]))
                }
                _ => None,
            };
            if let Some(index) = index
                && let Some(Constant::Str { utf8 }) = self.pool.get(index as usize)
            {
                out.push(self.utf8(*utf8).ok_or(SniffError::BadUtf8Index(*utf8))?);
            }
            pc += instruction_len(code, pc)?;
        }
        Ok(out)
    }
}

/// Total byte length of the instruction at `pc`, including the opcode.
fn instruction_len(code: &[u8], pc: usize) -> Result<usize> {
    let op = code[pc];
    let len = match op {
        // single-byte instructions
        0x00..=0x0f | 0x1a..=0x35 | 0x3b..=0x83 | 0x85..=0x98 | 0xac..=0xb1 | 0xbe | 0xbf
        | 0xc2 | 0xc3 | 0xca => 1,
        // one operand byte
        0x10 | 0x12 | 0x15..=0x19 | 0x36..=0x3a | 0xa9 | 0xbc => 2,
        // two operand bytes
        0x11 | 0x13 | 0x14 | 0x84 | 0x99..=0xa8 | 0xb2..=0xb8 | 0xbb | 0xbd | 0xc0 | 0xc1
        | 0xc6 | 0xc7 => 3,
        0xc5 => 4,
        0xb9 | 0xba | 0xc8 | 0xc9 => 5,
        // wide: doubled operand width, iinc carries two extra operand bytes
        0xc4 => match code.get(pc + 1) {
            Some(0x84) => 6,
            Some(_) => 4,
            None => return Err(SniffError::Truncated(pc)),
        },
        // tableswitch / lookupswitch: 4-byte aligned variable payload
        0xaa | 0xab => {
            let pad = (4 - ((pc + 1) % 4)) % 4;
            let base = pc + 1 + pad;
            let word = |at: usize| -> Result<u32> {
                let bytes = code.get(at..at + 4).ok_or(SniffError::Truncated(pc))?;
                Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            };
            if op == 0xaa {
                let low = word(base + 4)? as i32;
                let high = word(base + 8)? as i32;
                let entries = (high.wrapping_sub(low).wrapping_add(1)).max(0) as usize;
                1 + pad + 12 + entries * 4
            } else {
                let npairs = word(base + 4)? as usize;
                1 + pad + 8 + npairs * 8
            }
        }
        other => return Err(SniffError::UnknownOpcode(other)),
    };
    Ok(len)
}
