//! Binary writer
//!
//! Appends typed data to a growable buffer. Multibyte values are
//! little-endian; strings and collections carry a u16 length prefix.

use super::registry::TypeRegistry;
use super::value::{tag, Value};
use crate::error::{CofferError, Result};

/// Typed writer over an expandable byte buffer
pub struct BinaryWriter<'a> {
    buf: Vec<u8>,
    registry: &'a TypeRegistry,
}

impl<'a> BinaryWriter<'a> {
    /// Create an empty writer backed by the given registry
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            buf: Vec::new(),
            registry,
        }
    }

    /// Create a writer with a pre-sized buffer
    pub fn with_capacity(registry: &'a TypeRegistry, capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            registry,
        }
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the writer and return its buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // =========================================================================
    // Fixed-width primitives
    // =========================================================================

    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    pub fn write_word(&mut self, word: u16) {
        self.buf.extend_from_slice(&word.to_le_bytes());
    }

    pub fn write_int32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_uint32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_double(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Integers share the double codec for wire compatibility
    pub fn write_int(&mut self, value: i64) {
        self.write_double(value as f64);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    /// Append raw bytes without any prefix
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    // =========================================================================
    // Strings and collections
    // =========================================================================

    /// UTF-8 string with a u16 byte-count prefix
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_len(value.len())?;
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// ASCII string with a u16 byte-count prefix
    pub fn write_ascii_string(&mut self, value: &str) -> Result<()> {
        if !value.is_ascii() {
            return Err(CofferError::CorruptFrame(format!(
                "string is not ASCII: {:?}",
                value
            )));
        }
        self.write_len(value.len())?;
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn write_byte_list(&mut self, list: &[u8]) -> Result<()> {
        self.write_len(list.len())?;
        self.buf.extend_from_slice(list);
        Ok(())
    }

    /// Integer lists are stored as doubles, same tradeoff as scalar ints
    pub fn write_int_list(&mut self, list: &[i64]) -> Result<()> {
        self.write_len(list.len())?;
        for &item in list {
            self.write_double(item as f64);
        }
        Ok(())
    }

    pub fn write_double_list(&mut self, list: &[f64]) -> Result<()> {
        self.write_len(list.len())?;
        for &item in list {
            self.write_double(item);
        }
        Ok(())
    }

    pub fn write_bool_list(&mut self, list: &[bool]) -> Result<()> {
        self.write_len(list.len())?;
        for &item in list {
            self.write_bool(item);
        }
        Ok(())
    }

    pub fn write_string_list(&mut self, list: &[String]) -> Result<()> {
        self.write_len(list.len())?;
        for item in list {
            self.write_string(item)?;
        }
        Ok(())
    }

    pub fn write_list(&mut self, list: &[Value]) -> Result<()> {
        self.write_len(list.len())?;
        for item in list {
            self.write_value(item)?;
        }
        Ok(())
    }

    pub fn write_map(&mut self, entries: &[(Value, Value)]) -> Result<()> {
        self.write_len(entries.len())?;
        for (key, value) in entries {
            self.write_value(key)?;
            self.write_value(value)?;
        }
        Ok(())
    }

    // =========================================================================
    // Tagged values
    // =========================================================================

    /// Write a value tag followed by its payload.
    ///
    /// Custom values are dispatched through the registry: the matching
    /// adapter's external id becomes the tag (offset by 32) and the adapter
    /// serializes the payload.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.write_byte(tag::NULL),
            Value::Int(i) => {
                self.write_byte(tag::INT);
                self.write_int(*i);
            }
            Value::Double(d) => {
                self.write_byte(tag::DOUBLE);
                self.write_double(*d);
            }
            Value::Bool(b) => {
                self.write_byte(tag::BOOL);
                self.write_bool(*b);
            }
            Value::Str(s) => {
                self.write_byte(tag::STRING);
                self.write_string(s)?;
            }
            Value::Bytes(b) => {
                self.write_byte(tag::BYTE_LIST);
                self.write_byte_list(b)?;
            }
            Value::IntList(list) => {
                self.write_byte(tag::INT_LIST);
                self.write_int_list(list)?;
            }
            Value::DoubleList(list) => {
                self.write_byte(tag::DOUBLE_LIST);
                self.write_double_list(list)?;
            }
            Value::BoolList(list) => {
                self.write_byte(tag::BOOL_LIST);
                self.write_bool_list(list)?;
            }
            Value::StrList(list) => {
                self.write_byte(tag::STRING_LIST);
                self.write_string_list(list)?;
            }
            Value::List(list) => {
                self.write_byte(tag::LIST);
                self.write_list(list)?;
            }
            Value::Map(entries) => {
                self.write_byte(tag::MAP);
                self.write_map(entries)?;
            }
            Value::Custom(custom) => {
                let (type_id, adapter) = self
                    .registry
                    .find_by_value(value)
                    .ok_or(CofferError::UnknownType(custom.type_id))?;
                self.write_byte(tag::CUSTOM_BASE + type_id);
                adapter.write(self, value)?;
            }
        }
        Ok(())
    }

    /// u16 length prefix; collections beyond 65535 elements do not fit the
    /// wire format
    fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u16::try_from(len).map_err(|_| {
            CofferError::UnsupportedOperation("collection longer than 65535 elements")
        })?;
        self.write_word(len);
        Ok(())
    }
}
