//! 单文件 NRRD 格式的最小读写实现。
//!
//! 只支持数据紧跟在文件头之后的形式（不支持 detached header），
//! 编码支持`raw`、`gzip`和`ascii`。数据按 NRRD 约定以第一个轴变化最快的顺序存储。

use super::VoxelElement;
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{ArrayD, ArrayViewD, IxDyn, ShapeBuilder};
use std::fs;
use std::io::{Read, Write};
use std::mem::size_of;
use std::path::Path;

const MAGIC: &str = "NRRD000";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ScalarType {
    fn parse(s: &str) -> Option<Self> {
        use ScalarType::*;
        let ty = match s {
            "signed char" | "int8" | "int8_t" => I8,
            "uchar" | "unsigned char" | "uint8" | "uint8_t" => U8,
            "short" | "short int" | "signed short" | "signed short int" | "int16" | "int16_t" => {
                I16
            }
            "ushort" | "unsigned short" | "unsigned short int" | "uint16" | "uint16_t" => U16,
            "int" | "signed int" | "int32" | "int32_t" => I32,
            "uint" | "unsigned int" | "uint32" | "uint32_t" => U32,
            "longlong" | "long long" | "long long int" | "signed long long"
            | "signed long long int" | "int64" | "int64_t" => I64,
            "ulonglong" | "unsigned long long" | "unsigned long long int" | "uint64"
            | "uint64_t" => U64,
            "float" => F32,
            "double" => F64,
            _ => return None,
        };
        Some(ty)
    }

    #[inline]
    fn size(self) -> usize {
        use ScalarType::*;
        match self {
            I8 | U8 => 1,
            I16 | U16 => 2,
            I32 | U32 | F32 => 4,
            I64 | U64 | F64 => 8,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Encoding {
    Raw,
    Gzip,
    Ascii,
}

/// 解析后的文件头。
#[derive(Debug)]
struct Header {
    ty: ScalarType,
    sizes: Vec<usize>,
    big_endian: bool,
    encoding: Encoding,
    spacing: Option<Vec<f64>>,
}

/// 读取`path`处的 NRRD 文件，返回体数据（形状与`sizes`字段一致）和可选的体素间距。
pub fn read<P: AsRef<Path>>(path: P) -> Result<(ArrayD<f64>, Option<Vec<f64>>)> {
    let path = path.as_ref();
    let err = |reason: String| Error::Nrrd {
        path: path.to_owned(),
        reason,
    };

    let bytes = fs::read(path)?;
    let (text, payload) = split_header(&bytes).ok_or_else(|| err("找不到文件头结束标记".into()))?;
    let header = parse_header(text).map_err(err)?;

    let (count, needed) = payload_len(&header).map_err(err)?;
    let values = match header.encoding {
        Encoding::Raw => decode_binary(payload, &header, count),
        Encoding::Gzip => {
            // 文件头中的尺寸不可信，不按它预先分配内存。
            let mut inflated = Vec::new();
            GzDecoder::new(payload)
                .take(needed as u64)
                .read_to_end(&mut inflated)?;
            decode_binary(&inflated, &header, count)
        }
        Encoding::Ascii => decode_ascii(payload, count),
    }
    .map_err(err)?;

    let data = ArrayD::from_shape_vec(IxDyn(&header.sizes).f(), values)
        .map_err(|e| err(e.to_string()))?;
    Ok((data, header.spacing))
}

/// 将`data`以 gzip 编码、小端序写入`path`。
pub fn write<A: VoxelElement, P: AsRef<Path>>(
    path: P,
    data: ArrayViewD<'_, A>,
    spacing: Option<&[f64]>,
) -> Result<()> {
    let mut text = String::new();
    text.push_str("NRRD0004\n");
    text.push_str("# Complete NRRD file format specification at:\n");
    text.push_str("# http://teem.sourceforge.net/nrrd/format.html\n");
    text.push_str(&format!("type: {}\n", A::NRRD_TYPE));
    text.push_str(&format!("dimension: {}\n", data.ndim()));
    text.push_str(&format!("sizes: {}\n", join(data.shape())));
    if let Some(spacing) = spacing.filter(|s| s.len() == data.ndim()) {
        text.push_str(&format!("spacings: {}\n", join(spacing)));
    }
    text.push_str("endian: little\n");
    text.push_str("encoding: gzip\n\n");

    // 第一个轴变化最快。
    let mut raw = Vec::with_capacity(data.len() * size_of::<A>());
    for v in data.t().iter() {
        v.extend_le_bytes(&mut raw);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    let compressed = encoder.finish()?;

    let mut file = fs::File::create(path)?;
    file.write_all(text.as_bytes())?;
    file.write_all(&compressed)?;
    Ok(())
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 在第一个空行处把文件切分为文件头文本和数据部分。
fn split_header(bytes: &[u8]) -> Option<(&str, &[u8])> {
    let mut line_start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'\n' {
            continue;
        }
        let line = &bytes[line_start..i];
        if line.is_empty() || line == b"\r" {
            let text = std::str::from_utf8(&bytes[..line_start]).ok()?;
            return Some((text, &bytes[i + 1..]));
        }
        line_start = i + 1;
    }
    None
}

fn parse_header(text: &str) -> std::result::Result<Header, String> {
    let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));
    match lines.next() {
        Some(l) if l.starts_with(MAGIC) => {}
        _ => return Err("缺少`NRRD000x`魔数".into()),
    }

    let mut ty = None;
    let mut dimension = None;
    let mut sizes = None;
    let mut big_endian = false;
    let mut encoding = None;
    let mut spacing = None;

    for line in lines {
        if line.is_empty() || line.starts_with('#') || line.contains(":=") {
            continue;
        }
        let Some((field, desc)) = line.split_once(':') else {
            return Err(format!("无法解析的文件头行`{line}`"));
        };
        let desc = desc.trim();
        match field.trim().to_ascii_lowercase().as_str() {
            "type" => {
                ty = Some(ScalarType::parse(desc).ok_or(format!("不支持的数据类型`{desc}`"))?)
            }
            "dimension" => {
                dimension = Some(desc.parse::<usize>().map_err(|e| e.to_string())?);
            }
            "sizes" => {
                let v = desc
                    .split_whitespace()
                    .map(str::parse::<usize>)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| e.to_string())?;
                sizes = Some(v);
            }
            "endian" => big_endian = desc == "big",
            "encoding" => {
                encoding = Some(match desc {
                    "raw" => Encoding::Raw,
                    "gzip" | "gz" => Encoding::Gzip,
                    "ascii" | "text" | "txt" => Encoding::Ascii,
                    other => return Err(format!("不支持的编码`{other}`")),
                })
            }
            "spacings" => {
                let v = desc
                    .split_whitespace()
                    .map(str::parse::<f64>)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| e.to_string())?;
                spacing = Some(v);
            }
            "space directions" => {
                // `spacings`字段优先。
                if spacing.is_none() {
                    spacing = Some(parse_space_directions(desc)?);
                }
            }
            "data file" | "datafile" => return Err("不支持 detached header".into()),
            "byte skip" | "byteskip" | "line skip" | "lineskip" if desc != "0" => {
                return Err(format!("不支持的字段`{field}: {desc}`"))
            }
            _ => {}
        }
    }

    let ty = ty.ok_or("缺少`type`字段")?;
    let sizes = sizes.ok_or("缺少`sizes`字段")?;
    let encoding = encoding.ok_or("缺少`encoding`字段")?;
    if let Some(d) = dimension {
        if d != sizes.len() {
            return Err(format!("`dimension: {d}`与`sizes`的个数{}不一致", sizes.len()));
        }
    }
    // 间距个数与轴数不一致时丢弃。
    let spacing = spacing.filter(|s| s.len() == sizes.len());

    Ok(Header {
        ty,
        sizes,
        big_endian,
        encoding,
        spacing,
    })
}

/// 从`space directions`字段取每个轴方向向量的长度作为体素间距，`none`轴记为 NaN。
fn parse_space_directions(desc: &str) -> std::result::Result<Vec<f64>, String> {
    let mut out = Vec::new();
    let mut rest = desc.trim();
    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix("none") {
            out.push(f64::NAN);
            rest = r.trim_start();
            continue;
        }
        if !rest.starts_with('(') {
            return Err(format!("无法解析的方向向量`{rest}`"));
        }
        let end = rest.find(')').ok_or(format!("方向向量缺少右括号: `{rest}`"))?;
        let mut norm = 0.0;
        for c in rest[1..end].split(',') {
            let v: f64 = c.trim().parse().map_err(|_| format!("无法解析的分量`{c}`"))?;
            norm += v * v;
        }
        out.push(norm.sqrt());
        rest = rest[end + 1..].trim_start();
    }
    Ok(out)
}

/// 体素个数和二进制数据的字节数。溢出时返回错误。
fn payload_len(header: &Header) -> std::result::Result<(usize, usize), String> {
    let overflow = || format!("`sizes: {}`的体素数溢出", join(&header.sizes));
    let count = header
        .sizes
        .iter()
        .try_fold(1_usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(overflow)?;
    let needed = count.checked_mul(header.ty.size()).ok_or_else(overflow)?;
    Ok((count, needed))
}

macro_rules! decode_as {
    ($bytes: expr, $t: ty, $big: expr) => {
        $bytes
            .chunks_exact(size_of::<$t>())
            .map(|c| {
                let mut raw = [0_u8; size_of::<$t>()];
                raw.copy_from_slice(c);
                let v = if $big {
                    <$t>::from_be_bytes(raw)
                } else {
                    <$t>::from_le_bytes(raw)
                };
                v as f64
            })
            .collect::<Vec<f64>>()
    };
}

fn decode_binary(
    bytes: &[u8],
    header: &Header,
    count: usize,
) -> std::result::Result<Vec<f64>, String> {
    let needed = count.saturating_mul(header.ty.size());
    if bytes.len() < needed {
        return Err(format!("数据长度{}字节，不足{needed}字节", bytes.len()));
    }
    let bytes = &bytes[..needed];
    let big = header.big_endian;
    let values = match header.ty {
        ScalarType::I8 => decode_as!(bytes, i8, big),
        ScalarType::U8 => decode_as!(bytes, u8, big),
        ScalarType::I16 => decode_as!(bytes, i16, big),
        ScalarType::U16 => decode_as!(bytes, u16, big),
        ScalarType::I32 => decode_as!(bytes, i32, big),
        ScalarType::U32 => decode_as!(bytes, u32, big),
        ScalarType::I64 => decode_as!(bytes, i64, big),
        ScalarType::U64 => decode_as!(bytes, u64, big),
        ScalarType::F32 => decode_as!(bytes, f32, big),
        ScalarType::F64 => decode_as!(bytes, f64, big),
    };
    Ok(values)
}

fn decode_ascii(bytes: &[u8], count: usize) -> std::result::Result<Vec<f64>, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
    let values = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .take(count)
        .map(str::parse::<f64>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    if values.len() < count {
        return Err(format!("文本数据只有{}个值，不足{count}个", values.len()));
    }
    Ok(values)
}
