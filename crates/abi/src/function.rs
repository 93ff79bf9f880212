//! Function signatures, selectors and calldata.

use alloy_primitives::keccak256;

use crate::{AbiError, AbiType, AbiValue, decode, encode, parse_argument};

/// A parsed function signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Input parameter types.
    pub inputs: Vec<AbiType>,
}

impl Function {
    /// Parses `name(types...)`. A trailing output list such as `(uint)` is ignored.
    pub fn parse(signature: &str) -> Result<Self, AbiError> {
        let compact: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
        let open = compact
            .find('(')
            .ok_or_else(|| AbiError::BadSignature(format!("missing parameter list in {signature}")))?;
        let name = &compact[..open];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
            return Err(AbiError::BadSignature(format!("invalid function name in {signature}")));
        }
        let inputs = AbiType::parse_list(extract_inputs(&compact)?)?;
        Ok(Self { name: name.to_string(), inputs })
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, AbiType::Tuple(self.inputs.clone()))
    }

    /// First four bytes of the keccak-256 of the canonical signature.
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    /// Selector followed by the encoded arguments.
    pub fn encode(&self, args: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
        let mut out = self.selector().to_vec();
        out.extend(encode(&self.inputs, args)?);
        Ok(out)
    }

    /// Parses string arguments and encodes them; returns hex without a `0x` prefix.
    pub fn encode_call<S: AsRef<str>>(&self, args: &[S]) -> Result<String, AbiError> {
        if args.len() != self.inputs.len() {
            return Err(AbiError::ArgumentCount { expected: self.inputs.len(), got: args.len() });
        }
        let values = self
            .inputs
            .iter()
            .zip(args)
            .map(|(ty, raw)| parse_argument(ty, raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.encode(&values).map(hex::encode)
    }

    /// Decodes calldata produced by [`Self::encode`].
    pub fn decode_input(&self, calldata: &[u8]) -> Result<Vec<AbiValue>, AbiError> {
        let (selector, body) = calldata.split_at_checked(4).ok_or(AbiError::Truncated(0))?;
        if selector != self.selector() {
            return Err(AbiError::InvalidData(format!(
                "selector 0x{} does not match {}",
                hex::encode(selector),
                self.signature()
            )));
        }
        decode(&self.inputs, body)
    }
}

/// Returns the first balanced parenthesis group of a signature, parentheses included.
pub fn extract_inputs(signature: &str) -> Result<&str, AbiError> {
    let open = signature
        .find('(')
        .ok_or_else(|| AbiError::BadSignature(format!("missing parameter list in {signature}")))?;
    let mut depth = 0usize;
    for (i, c) in signature[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&signature[open..=open + i]);
                }
            }
            _ => {}
        }
    }
    Err(AbiError::BadSignature(format!("unbalanced parentheses in {signature}")))
}

/// Selector of a signature.
pub fn selector(signature: &str) -> Result<[u8; 4], AbiError> {
    Function::parse(signature).map(|f| f.selector())
}

/// Encodes a call from a signature and string arguments; returns hex without a `0x` prefix.
pub fn encode_function_call<S: AsRef<str>>(signature: &str, args: &[S]) -> Result<String, AbiError> {
    Function::parse(signature)?.encode_call(args)
}
