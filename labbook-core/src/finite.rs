//! Non-finite float detection for blob payloads.
//!
//! JSON has no representation for `NaN` or `±inf`; `serde_json` silently
//! writes them as `null`, producing a blob that no longer deserializes into
//! the type that was saved. [`find_non_finite`] walks a value through a
//! checking `Serializer` and reports where the first such float sits.

use serde::Serialize;
use serde::ser::{self, Impossible};
use std::fmt;

#[derive(Debug)]
enum CheckError {
    /// Path segments are pushed innermost first while unwinding.
    NonFinite { path: Vec<String>, value: f64 },
    Custom(String),
}

impl CheckError {
    fn within(mut self, segment: impl fmt::Display) -> Self {
        if let CheckError::NonFinite { path, .. } = &mut self {
            path.push(segment.to_string());
        }
        self
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::NonFinite { value, .. } => write!(f, "non-finite float {value}"),
            CheckError::Custom(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for CheckError {}

impl ser::Error for CheckError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        CheckError::Custom(msg.to_string())
    }
}

/// Location (`loss`, `history[3].grad_norm`, ...) and value of the first
/// non-finite float in `value`, or `None` if every float is finite.
///
/// Errors raised by the value's own `Serialize` impl are ignored here; the
/// real serializer reports them.
pub(crate) fn find_non_finite<T: Serialize + ?Sized>(value: &T) -> Option<(String, f64)> {
    match value.serialize(FloatCheck) {
        Err(CheckError::NonFinite { mut path, value }) => {
            path.reverse();
            Some((render_path(&path), value))
        }
        _ => None,
    }
}

fn render_path(segments: &[String]) -> String {
    if segments.is_empty() {
        return "<root>".to_string();
    }
    let mut out = String::new();
    for segment in segments {
        if !out.is_empty() && !segment.starts_with('[') {
            out.push('.');
        }
        out.push_str(segment);
    }
    out
}

type Checked = Result<(), CheckError>;

fn check(value: f64) -> Checked {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CheckError::NonFinite {
            path: Vec::new(),
            value,
        })
    }
}

struct FloatCheck;

impl ser::Serializer for FloatCheck {
    type Ok = ();
    type Error = CheckError;
    type SerializeSeq = Compound;
    type SerializeTuple = Compound;
    type SerializeTupleStruct = Compound;
    type SerializeTupleVariant = Compound;
    type SerializeMap = Compound;
    type SerializeStruct = Compound;
    type SerializeStructVariant = Compound;

    fn serialize_bool(self, _: bool) -> Checked {
        Ok(())
    }

    fn serialize_i8(self, _: i8) -> Checked {
        Ok(())
    }

    fn serialize_i16(self, _: i16) -> Checked {
        Ok(())
    }

    fn serialize_i32(self, _: i32) -> Checked {
        Ok(())
    }

    fn serialize_i64(self, _: i64) -> Checked {
        Ok(())
    }

    fn serialize_i128(self, _: i128) -> Checked {
        Ok(())
    }

    fn serialize_u8(self, _: u8) -> Checked {
        Ok(())
    }

    fn serialize_u16(self, _: u16) -> Checked {
        Ok(())
    }

    fn serialize_u32(self, _: u32) -> Checked {
        Ok(())
    }

    fn serialize_u64(self, _: u64) -> Checked {
        Ok(())
    }

    fn serialize_u128(self, _: u128) -> Checked {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Checked {
        check(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Checked {
        check(v)
    }

    fn serialize_char(self, _: char) -> Checked {
        Ok(())
    }

    fn serialize_str(self, _: &str) -> Checked {
        Ok(())
    }

    fn serialize_bytes(self, _: &[u8]) -> Checked {
        Ok(())
    }

    fn serialize_none(self) -> Checked {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Checked {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Checked {
        Ok(())
    }

    fn serialize_unit_struct(self, _: &'static str) -> Checked {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Checked {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self).map_err(|e| e.within(variant))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Compound, CheckError> {
        Ok(Compound::default())
    }

    fn serialize_tuple(self, _: usize) -> Result<Compound, CheckError> {
        Ok(Compound::default())
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Compound, CheckError> {
        Ok(Compound::default())
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Compound, CheckError> {
        Ok(Compound::in_variant(variant))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Compound, CheckError> {
        Ok(Compound::default())
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Compound, CheckError> {
        Ok(Compound::default())
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Compound, CheckError> {
        Ok(Compound::in_variant(variant))
    }
}

/// State shared by every compound value: element index, pending map key and
/// enclosing enum variant.
#[derive(Default)]
struct Compound {
    index: usize,
    key: Option<String>,
    variant: Option<&'static str>,
}

impl Compound {
    fn in_variant(variant: &'static str) -> Self {
        Self {
            variant: Some(variant),
            ..Self::default()
        }
    }

    fn scoped(&self, error: CheckError) -> CheckError {
        match self.variant {
            Some(variant) => error.within(variant),
            None => error,
        }
    }

    fn element<T: Serialize + ?Sized>(&mut self, value: &T) -> Checked {
        let index = self.index;
        self.index += 1;
        value
            .serialize(FloatCheck)
            .map_err(|e| self.scoped(e.within(format_args!("[{index}]"))))
    }

    fn field<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Checked {
        value
            .serialize(FloatCheck)
            .map_err(|e| self.scoped(e.within(name)))
    }
}

impl ser::SerializeSeq for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Checked {
        self.element(value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTuple for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Checked {
        self.element(value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Checked {
        self.element(value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Checked {
        self.element(value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeMap for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Checked {
        self.key = Some(key.serialize(KeyName).unwrap_or_else(|_| "?".to_string()));
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Checked {
        let key = self.key.take().unwrap_or_default();
        self.field(&key, value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStruct for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Checked {
        self.field(key, value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStructVariant for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Checked {
        self.field(key, value)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

/// Renders scalar map keys for error paths.
struct KeyName;

type KeyResult = Result<String, CheckError>;

impl ser::Serializer for KeyName {
    type Ok = String;
    type Error = CheckError;
    type SerializeSeq = Impossible<String, CheckError>;
    type SerializeTuple = Impossible<String, CheckError>;
    type SerializeTupleStruct = Impossible<String, CheckError>;
    type SerializeTupleVariant = Impossible<String, CheckError>;
    type SerializeMap = Impossible<String, CheckError>;
    type SerializeStruct = Impossible<String, CheckError>;
    type SerializeStructVariant = Impossible<String, CheckError>;

    fn serialize_bool(self, v: bool) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_f32(self, v: f32) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_f64(self, v: f64) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> KeyResult {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _: &[u8]) -> KeyResult {
        Err(ser::Error::custom("bytes key"))
    }

    fn serialize_none(self) -> KeyResult {
        Ok("null".to_string())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> KeyResult {
        value.serialize(self)
    }

    fn serialize_unit(self) -> KeyResult {
        Ok("null".to_string())
    }

    fn serialize_unit_struct(self, name: &'static str) -> KeyResult {
        Ok(name.to_string())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, variant: &'static str) -> KeyResult {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> KeyResult {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> KeyResult {
        Err(ser::Error::custom("compound key"))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, CheckError> {
        Err(ser::Error::custom("compound key"))
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, CheckError> {
        Err(ser::Error::custom("compound key"))
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, CheckError> {
        Err(ser::Error::custom("compound key"))
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, CheckError> {
        Err(ser::Error::custom("compound key"))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap, CheckError> {
        Err(ser::Error::custom("compound key"))
    }

    fn serialize_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStruct, CheckError> {
        Err(ser::Error::custom("compound key"))
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, CheckError> {
        Err(ser::Error::custom("compound key"))
    }
}
