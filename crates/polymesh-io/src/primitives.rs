//! Typed binary values and tokenized text lines.
//!
//! Every mesh format bottoms out here: binary bodies are sequences of
//! declared scalar types (PLY, STL), text bodies are lines split into
//! positional tokens (OBJ, OFF, PLY ASCII, STL ASCII).

use std::io::{BufRead, Read, Write};
use std::ops::Range;
use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use num_traits::ToPrimitive;
use polymesh_core::DataType;

use crate::error::{MeshIoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// How scalar values are laid out in a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Decimal text, each value followed by a space.
    Ascii,
    Binary(Endian),
}

// ============================================================================
// Binary values
// ============================================================================

/// Reads one scalar of type `ty`, widened to `f64`.
pub fn read_binary<R: Read>(reader: &mut R, ty: DataType, endian: Endian) -> Result<f64> {
    let value = match endian {
        Endian::Little => read_with::<LittleEndian, R>(reader, ty)?,
        Endian::Big => read_with::<BigEndian, R>(reader, ty)?,
    };
    Ok(value)
}

fn read_with<B: ByteOrder, R: Read>(reader: &mut R, ty: DataType) -> std::io::Result<f64> {
    Ok(match ty {
        DataType::Int8 => reader.read_i8()? as f64,
        DataType::Uint8 => reader.read_u8()? as f64,
        DataType::Int16 => reader.read_i16::<B>()? as f64,
        DataType::Uint16 => reader.read_u16::<B>()? as f64,
        DataType::Int32 => reader.read_i32::<B>()? as f64,
        DataType::Uint32 => reader.read_u32::<B>()? as f64,
        DataType::Float32 => reader.read_f32::<B>()? as f64,
        DataType::Float64 => reader.read_f64::<B>()?,
    })
}

/// Reads a count-prefixed list: the count as `size_ty`, then that many `ty`.
pub fn read_binary_list<R: Read>(
    reader: &mut R,
    size_ty: DataType,
    ty: DataType,
    endian: Endian,
) -> Result<Vec<f64>> {
    let count = read_binary(reader, size_ty, endian)?;
    let count = list_len(count)?;
    (0..count).map(|_| read_binary(reader, ty, endian)).collect()
}

pub(crate) fn list_len(count: f64) -> Result<usize> {
    if count < 0.0 || count.fract() != 0.0 {
        return Err(MeshIoError::malformed(format!("Invalid list length {count}")));
    }
    Ok(count as usize)
}

/// Writes `value` narrowed to `ty`. Values that do not fit are an error.
pub fn write_binary<W: Write, T: ToPrimitive + Copy>(
    writer: &mut W,
    value: T,
    ty: DataType,
    endian: Endian,
) -> Result<()> {
    let v = narrow(value, ty)?;
    match endian {
        Endian::Little => write_with::<LittleEndian, W>(writer, v, ty)?,
        Endian::Big => write_with::<BigEndian, W>(writer, v, ty)?,
    }
    Ok(())
}

fn write_with<B: ByteOrder, W: Write>(writer: &mut W, v: f64, ty: DataType) -> std::io::Result<()> {
    match ty {
        DataType::Int8 => writer.write_i8(v as i8),
        DataType::Uint8 => writer.write_u8(v as u8),
        DataType::Int16 => writer.write_i16::<B>(v as i16),
        DataType::Uint16 => writer.write_u16::<B>(v as u16),
        DataType::Int32 => writer.write_i32::<B>(v as i32),
        DataType::Uint32 => writer.write_u32::<B>(v as u32),
        DataType::Float32 => writer.write_f32::<B>(v as f32),
        DataType::Float64 => writer.write_f64::<B>(v),
    }
}

fn narrow<T: ToPrimitive + Copy>(value: T, ty: DataType) -> Result<f64> {
    ty.narrow(value).ok_or_else(|| {
        MeshIoError::malformed(format!(
            "Value {} does not fit in {:?}",
            value.to_f64().unwrap_or(f64::NAN),
            ty
        ))
    })
}

// ============================================================================
// Encoding-agnostic writing
// ============================================================================

/// Writes one value in the given encoding.
///
/// ASCII values are printed in the shortest form that reads back to the
/// same number of type `ty`, followed by a single space.
pub fn write_value<W: Write, T: ToPrimitive + Copy>(
    writer: &mut W,
    value: T,
    ty: DataType,
    encoding: Encoding,
) -> Result<()> {
    match encoding {
        Encoding::Binary(endian) => write_binary(writer, value, ty, endian),
        Encoding::Ascii => {
            let v = narrow(value, ty)?;
            write!(writer, "{} ", format_scalar(v, ty))?;
            Ok(())
        }
    }
}

/// Decimal form of a value already narrowed to `ty`.
pub fn format_scalar(v: f64, ty: DataType) -> String {
    match ty {
        DataType::Float32 => format!("{}", v as f32),
        DataType::Float64 => format!("{}", v),
        _ => format!("{}", v as i64),
    }
}

/// Reads a color channel stored as `ty`: real types hold `[0, 1]` and are
/// rounded to the nearest byte.
pub fn color_from_scalar(value: f64, ty: DataType) -> u8 {
    let v = if ty.is_integral() { value } else { (value * 255.0).round() };
    v.clamp(0.0, 255.0) as u8
}

/// Converts a color channel to the value stored for `ty`.
pub fn color_to_scalar(channel: u8, ty: DataType) -> f64 {
    if ty.is_integral() {
        channel as f64
    } else {
        channel as f64 / 255.0
    }
}

// ============================================================================
// Text tokens
// ============================================================================

/// One line split into positional tokens with a read cursor.
#[derive(Debug, Clone)]
pub struct Tokens {
    line: String,
    spans: Vec<Range<usize>>,
    pos: usize,
}

impl Tokens {
    /// Splits on runs of whitespace.
    pub fn new(line: impl Into<String>) -> Self {
        let line = line.into();
        let base = line.as_ptr() as usize;
        let spans = line
            .split_whitespace()
            .map(|t| {
                let start = t.as_ptr() as usize - base;
                start..start + t.len()
            })
            .collect();
        Self { line, spans, pos: 0 }
    }

    /// Splits on every `delimiter`, keeping empty fields (`1//3` has three).
    pub fn with_delimiter(line: impl Into<String>, delimiter: char) -> Self {
        let line = line.into();
        let mut spans = Vec::new();
        let mut start = 0;
        for (i, c) in line.char_indices() {
            if c == delimiter {
                spans.push(start..i);
                start = i + c.len_utf8();
            }
        }
        spans.push(start..line.len());
        Self { line, spans, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Number of tokens consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.spans.len().saturating_sub(self.pos)
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        self.spans.get(i).map(|s| &self.line[s.clone()])
    }

    pub fn peek(&self) -> Option<&str> {
        self.get(self.pos)
    }

    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.spans.len());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.spans.iter().map(move |s| &self.line[s.clone()])
    }

    pub fn next_str(&mut self) -> Result<&str> {
        let span = self
            .spans
            .get(self.pos)
            .cloned()
            .ok_or_else(|| MeshIoError::malformed("Unexpected end of line"))?;
        self.pos += 1;
        Ok(&self.line[span])
    }

    pub fn next_parse<T: FromStr>(&mut self) -> Result<T> {
        let token = self.next_str()?;
        token
            .parse::<T>()
            .map_err(|_| MeshIoError::malformed(format!("Cannot parse token '{token}'")))
    }

    pub fn next_f64(&mut self) -> Result<f64> {
        self.next_parse()
    }

    pub fn next_u32(&mut self) -> Result<u32> {
        self.next_parse()
    }

    /// Reads a token as a value of type `ty`. Integral types truncate.
    pub fn next_value(&mut self, ty: DataType) -> Result<f64> {
        let v = self.next_f64()?;
        Ok(if ty.is_integral() { v.trunc() } else { v })
    }

    /// Reads a count-prefixed list of values.
    pub fn next_list(&mut self, size_ty: DataType, ty: DataType) -> Result<Vec<f64>> {
        let count = list_len(self.next_value(size_ty)?)?;
        (0..count).map(|_| self.next_value(ty)).collect()
    }
}

/// Line-oriented reader that tracks how many bytes it has consumed.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    bytes_read: u64,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, bytes_read: 0 }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Next raw line without its terminator, or `None` at end of stream.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = self.inner.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        self.bytes_read += n as u64;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Next line that holds at least one token.
    pub fn next_tokens(&mut self) -> Result<Option<Tokens>> {
        while let Some(line) = self.read_line()? {
            let tokens = Tokens::new(line);
            if !tokens.is_empty() {
                return Ok(Some(tokens));
            }
        }
        Ok(None)
    }

    /// Like `next_tokens`, but the end of the stream is an error.
    pub fn expect_tokens(&mut self, what: &str) -> Result<Tokens> {
        self.next_tokens()?
            .ok_or_else(|| MeshIoError::malformed(format!("Unexpected end of file reading {what}")))
    }

    /// The underlying stream, positioned right after the last line read.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}
