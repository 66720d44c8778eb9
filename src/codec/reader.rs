//! Binary reader
//!
//! Cursor over a borrowed byte slice, mirroring the writer. Every read
//! checks that enough bytes remain and fails with `CorruptFrame` otherwise.

use super::registry::TypeRegistry;
use super::value::{tag, Value};
use crate::error::{CofferError, Result};

/// Typed reader over a byte slice
pub struct BinaryReader<'a> {
    buf: &'a [u8],
    pos: usize,
    registry: &'a TypeRegistry,
}

impl<'a> BinaryReader<'a> {
    pub fn new(buf: &'a [u8], registry: &'a TypeRegistry) -> Self {
        Self {
            buf,
            pos: 0,
            registry,
        }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Current cursor position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Advance the cursor without decoding
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.require(count)?;
        self.pos += count;
        Ok(())
    }

    // =========================================================================
    // Fixed-width primitives
    // =========================================================================

    pub fn read_byte(&mut self) -> Result<u8> {
        self.require(1)?;
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_word(&mut self) -> Result<u16> {
        let bytes = self.read_raw(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_int32(&mut self) -> Result<i32> {
        let bytes = self.read_raw(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_uint32(&mut self) -> Result<u32> {
        let bytes = self.read_raw(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_double(&mut self) -> Result<f64> {
        let bytes = self.read_raw(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(raw))
    }

    /// Integers share the double codec; the float is truncated on read
    pub fn read_int(&mut self) -> Result<i64> {
        Ok(self.read_double()? as i64)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_byte()? != 0)
    }

    /// Borrow the next `count` bytes and advance past them
    pub fn read_raw(&mut self, count: usize) -> Result<&'a [u8]> {
        self.require(count)?;
        let bytes = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    // =========================================================================
    // Strings and collections
    // =========================================================================

    /// UTF-8 string with a u16 byte-count prefix
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_word()? as usize;
        let bytes = self.read_raw(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| CofferError::CorruptFrame("invalid UTF-8 in string".to_string()))
    }

    /// ASCII string with a u16 byte-count prefix
    pub fn read_ascii_string(&mut self) -> Result<String> {
        let len = self.read_word()? as usize;
        let bytes = self.read_raw(len)?;
        if !bytes.is_ascii() {
            return Err(CofferError::CorruptFrame(
                "invalid ASCII in string".to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn read_byte_list(&mut self) -> Result<Vec<u8>> {
        let len = self.read_word()? as usize;
        Ok(self.read_raw(len)?.to_vec())
    }

    pub fn read_int_list(&mut self) -> Result<Vec<i64>> {
        let len = self.read_word()? as usize;
        let mut list = Vec::with_capacity(len);
        for _ in 0..len {
            list.push(self.read_int()?);
        }
        Ok(list)
    }

    pub fn read_double_list(&mut self) -> Result<Vec<f64>> {
        let len = self.read_word()? as usize;
        let mut list = Vec::with_capacity(len);
        for _ in 0..len {
            list.push(self.read_double()?);
        }
        Ok(list)
    }

    pub fn read_bool_list(&mut self) -> Result<Vec<bool>> {
        let len = self.read_word()? as usize;
        let mut list = Vec::with_capacity(len);
        for _ in 0..len {
            list.push(self.read_bool()?);
        }
        Ok(list)
    }

    pub fn read_string_list(&mut self) -> Result<Vec<String>> {
        let len = self.read_word()? as usize;
        let mut list = Vec::with_capacity(len);
        for _ in 0..len {
            list.push(self.read_string()?);
        }
        Ok(list)
    }

    pub fn read_list(&mut self) -> Result<Vec<Value>> {
        let len = self.read_word()? as usize;
        let mut list = Vec::with_capacity(len);
        for _ in 0..len {
            list.push(self.read_value()?);
        }
        Ok(list)
    }

    pub fn read_map(&mut self) -> Result<Vec<(Value, Value)>> {
        let len = self.read_word()? as usize;
        let mut entries = Vec::with_capacity(len);
        for _ in 0..len {
            let key = self.read_value()?;
            let value = self.read_value()?;
            entries.push((key, value));
        }
        Ok(entries)
    }

    // =========================================================================
    // Tagged values
    // =========================================================================

    /// Read a tag byte, then the value it announces
    pub fn read_value(&mut self) -> Result<Value> {
        let value_tag = self.read_byte()?;
        self.read_value_with_tag(value_tag)
    }

    /// Read the payload for an already-consumed tag byte
    pub fn read_value_with_tag(&mut self, value_tag: u8) -> Result<Value> {
        match value_tag {
            tag::NULL => Ok(Value::Null),
            tag::INT => Ok(Value::Int(self.read_int()?)),
            tag::DOUBLE => Ok(Value::Double(self.read_double()?)),
            tag::BOOL => Ok(Value::Bool(self.read_bool()?)),
            tag::STRING => Ok(Value::Str(self.read_string()?)),
            tag::BYTE_LIST => Ok(Value::Bytes(self.read_byte_list()?)),
            tag::INT_LIST => Ok(Value::IntList(self.read_int_list()?)),
            tag::DOUBLE_LIST => Ok(Value::DoubleList(self.read_double_list()?)),
            tag::BOOL_LIST => Ok(Value::BoolList(self.read_bool_list()?)),
            tag::STRING_LIST => Ok(Value::StrList(self.read_string_list()?)),
            tag::LIST => Ok(Value::List(self.read_list()?)),
            tag::MAP => Ok(Value::Map(self.read_map()?)),
            t if t >= tag::CUSTOM_BASE => {
                let type_id = t - tag::CUSTOM_BASE;
                let adapter = self
                    .registry
                    .find_by_id(type_id)
                    .ok_or(CofferError::UnknownType(type_id))?;
                adapter.read(self)
            }
            t => Err(CofferError::CorruptFrame(format!(
                "reserved value tag {}",
                t
            ))),
        }
    }

    fn require(&self, count: usize) -> Result<()> {
        if self.pos + count > self.buf.len() {
            return Err(CofferError::CorruptFrame(format!(
                "unexpected end of frame: needed {} bytes, {} remain",
                count,
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }
}
