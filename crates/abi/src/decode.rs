//! Head/tail decoder, the inverse of [`crate::encode`].

use alloy_primitives::{Address, I256, U256};

use crate::{AbiError, AbiType, AbiValue, WORD};

/// Decodes an argument block into one value per type.
pub fn decode(types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>, AbiError> {
    decode_sequence(types.iter(), data)
}

fn decode_sequence<'a>(
    types: impl Iterator<Item = &'a AbiType>,
    data: &[u8],
) -> Result<Vec<AbiValue>, AbiError> {
    let mut offset = 0;
    let mut values = Vec::new();
    for ty in types {
        let value = if ty.is_dynamic() {
            let pointer = read_usize(data, offset)?;
            let body = data.get(pointer..).ok_or(AbiError::Truncated(pointer))?;
            offset += WORD;
            decode_value(ty, body)?
        } else {
            let body = data.get(offset..).ok_or(AbiError::Truncated(offset))?;
            offset += ty.head_size()?;
            decode_value(ty, body)?
        };
        values.push(value);
    }
    Ok(values)
}

fn decode_value(ty: &AbiType, data: &[u8]) -> Result<AbiValue, AbiError> {
    match ty {
        AbiType::Uint(bits) => {
            let value = U256::from_be_slice(read_word(data, 0)?);
            if *bits < 256 && value.bit_len() > *bits {
                return Err(AbiError::InvalidData(format!("{value} overflows uint{bits}")));
            }
            Ok(AbiValue::Uint(value))
        }
        AbiType::Int(bits) => {
            let value = I256::from_raw(U256::from_be_slice(read_word(data, 0)?));
            if *bits < 256 {
                let limit = U256::from(1) << (*bits - 1);
                let abs = value.unsigned_abs();
                let in_range = if value.is_negative() { abs <= limit } else { abs < limit };
                if !in_range {
                    return Err(AbiError::InvalidData(format!("{value} overflows int{bits}")));
                }
            }
            Ok(AbiValue::Int(value))
        }
        AbiType::Address => {
            let word = read_word(data, 0)?;
            if word[..WORD - 20].iter().any(|b| *b != 0) {
                return Err(AbiError::InvalidData("address has dirty high bytes".to_string()));
            }
            Ok(AbiValue::Address(Address::from_slice(&word[WORD - 20..])))
        }
        AbiType::Bool => match read_usize(data, 0)? {
            0 => Ok(AbiValue::Bool(false)),
            1 => Ok(AbiValue::Bool(true)),
            other => Err(AbiError::InvalidData(format!("{other} is not a bool"))),
        },
        AbiType::FixedBytes(size) => Ok(AbiValue::FixedBytes(read_word(data, 0)?[..*size].to_vec())),
        AbiType::Bytes => read_bytes(data).map(|bytes| AbiValue::Bytes(bytes.to_vec())),
        AbiType::String => {
            let bytes = read_bytes(data)?;
            String::from_utf8(bytes.to_vec())
                .map(AbiValue::String)
                .map_err(|e| AbiError::InvalidData(e.to_string()))
        }
        AbiType::Array(inner) => {
            let len = read_usize(data, 0)?;
            let body = &data[WORD..];
            if len > body.len() / WORD {
                return Err(AbiError::InvalidData(format!("array length {len} exceeds data")));
            }
            decode_sequence(std::iter::repeat_n(inner.as_ref(), len), body).map(AbiValue::Array)
        }
        AbiType::FixedArray(inner, len) => {
            decode_sequence(std::iter::repeat_n(inner.as_ref(), *len), data).map(AbiValue::Array)
        }
        AbiType::Tuple(types) => decode_sequence(types.iter(), data).map(AbiValue::Tuple),
    }
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    data.get(offset..offset + WORD).ok_or(AbiError::Truncated(offset))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let value = U256::from_be_slice(read_word(data, offset)?);
    usize::try_from(value).map_err(|_| AbiError::InvalidData(format!("{value} is not a valid length")))
}

fn read_bytes(data: &[u8]) -> Result<&[u8], AbiError> {
    let len = read_usize(data, 0)?;
    data.get(WORD..WORD + len).ok_or(AbiError::Truncated(WORD))
}
