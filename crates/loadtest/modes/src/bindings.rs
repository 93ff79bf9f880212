//! Calldata builders for the contracts surge drives.
//!
//! The load test contract exposes one `testXXX(uint256 iterations)` method per exercised opcode
//! and one `testXXX(bytes)` method per precompile. Token and router calls follow the usual
//! OpenZeppelin and SwapRouter02 signatures.

use rand::Rng;
use surge_abi::{AbiValue, Function};
use surge_primitives::{Address, Bytes, U256, Wallet, keccak256};

use crate::ModeError;

/// `store(bytes)` on the load test contract.
pub const STORE_SIGNATURE: &str = "store(bytes)";

/// Counter increment on the load test contract.
pub const INC_SIGNATURE: &str = "inc()";

/// ERC-20 `transfer`.
pub const ERC20_TRANSFER_SIGNATURE: &str = "transfer(address,uint256)";

/// `balanceOf`, shared by ERC-20 and ERC-721.
pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";

/// ERC-721 batch mint.
pub const ERC721_MINT_BATCH_SIGNATURE: &str = "mintBatch(address,uint256)";

/// SwapRouter02 `exactInputSingle`.
pub const EXACT_INPUT_SINGLE_SIGNATURE: &str =
    "exactInputSingle((address,address,uint24,address,uint256,uint256,uint160))";

/// Selector of `balanceOf(address)`; calls to it mark an ERC-20.
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Selector of `tokenURI(uint256)`; calls to it mark an ERC-721.
pub const TOKEN_URI_SELECTOR: [u8; 4] = [0xc8, 0x7b, 0x56, 0xdd];

/// Opcodes with a load test method, by opcode number.
pub const OPCODES: [(u64, &str); 61] = [
    (0x01, "ADD"),
    (0x02, "MUL"),
    (0x03, "SUB"),
    (0x04, "DIV"),
    (0x05, "SDIV"),
    (0x06, "MOD"),
    (0x07, "SMOD"),
    (0x08, "ADDMOD"),
    (0x09, "MULMOD"),
    (0x0A, "EXP"),
    (0x0B, "SIGNEXTEND"),
    (0x10, "LT"),
    (0x11, "GT"),
    (0x12, "SLT"),
    (0x13, "SGT"),
    (0x14, "EQ"),
    (0x15, "ISZERO"),
    (0x16, "AND"),
    (0x17, "OR"),
    (0x18, "XOR"),
    (0x19, "NOT"),
    (0x1A, "BYTE"),
    (0x1B, "SHL"),
    (0x1C, "SHR"),
    (0x1D, "SAR"),
    (0x20, "SHA3"),
    (0x30, "ADDRESS"),
    (0x31, "BALANCE"),
    (0x32, "ORIGIN"),
    (0x33, "CALLER"),
    (0x34, "CALLVALUE"),
    (0x35, "CALLDATALOAD"),
    (0x36, "CALLDATASIZE"),
    (0x37, "CALLDATACOPY"),
    (0x38, "CODESIZE"),
    (0x39, "CODECOPY"),
    (0x3A, "GASPRICE"),
    (0x3B, "EXTCODESIZE"),
    (0x3D, "RETURNDATASIZE"),
    (0x3E, "RETURNDATACOPY"),
    (0x40, "BLOCKHASH"),
    (0x41, "COINBASE"),
    (0x42, "TIMESTAMP"),
    (0x43, "NUMBER"),
    (0x44, "DIFFICULTY"),
    (0x45, "GASLIMIT"),
    (0x46, "CHAINID"),
    (0x47, "SELFBALANCE"),
    (0x48, "BASEFEE"),
    (0x51, "MLOAD"),
    (0x52, "MSTORE"),
    (0x53, "MSTORE8"),
    (0x54, "SLOAD"),
    (0x55, "SSTORE"),
    (0x59, "MSIZE"),
    (0x5A, "GAS"),
    (0xA0, "LOG0"),
    (0xA1, "LOG1"),
    (0xA2, "LOG2"),
    (0xA3, "LOG3"),
    (0xA4, "LOG4"),
];

/// RETURNDATACOPY is broken in the load test contract and never drawn at random.
const RANDOM_EXCLUDED_OPCODE: u64 = 0x3E;

/// Load test method name for an opcode, e.g. `ADD` for `0x01`.
pub fn opcode_name(opcode: u64) -> Option<&'static str> {
    OPCODES.iter().find(|(code, _)| *code == opcode).map(|(_, name)| *name)
}

/// Draws an opcode uniformly from the set that is safe to call.
pub fn random_opcode<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    let candidates: Vec<u64> = OPCODES
        .iter()
        .map(|(code, _)| *code)
        .filter(|code| *code != RANDOM_EXCLUDED_OPCODE)
        .collect();
    candidates[rng.gen_range(0..candidates.len())]
}

/// Calldata for `test<OPCODE>(iterations)`.
pub fn opcode_call(opcode: u64, iterations: u64) -> Result<Bytes, ModeError> {
    let name = opcode_name(opcode).ok_or(ModeError::UnknownOpcode(opcode))?;
    encode(&format!("test{name}(uint256)"), &[AbiValue::uint(iterations)])
}

/// A precompile the load test contract can exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precompile {
    /// `ecrecover` at address 1.
    EcRecover,
    /// SHA-256 at address 2.
    Sha256,
    /// RIPEMD-160 at address 3.
    Ripemd160,
    /// Identity at address 4.
    Identity,
    /// Modular exponentiation at address 5.
    ModExp,
    /// alt_bn128 addition at address 6.
    EcAdd,
    /// alt_bn128 scalar multiplication at address 7.
    EcMul,
    /// alt_bn128 pairing check at address 8.
    EcPairing,
    /// BLAKE2 compression at address 9.
    Blake2f,
}

impl Precompile {
    /// Precompiles drawn at random. EcAdd and EcMul need far more gas than the rest and are
    /// known to fail in the load test contract.
    pub const RANDOM_POOL: [Self; 7] = [
        Self::EcRecover,
        Self::Sha256,
        Self::Ripemd160,
        Self::Identity,
        Self::ModExp,
        Self::EcPairing,
        Self::Blake2f,
    ];

    /// Precompile at the given address.
    pub const fn from_address(address: u64) -> Option<Self> {
        Some(match address {
            1 => Self::EcRecover,
            2 => Self::Sha256,
            3 => Self::Ripemd160,
            4 => Self::Identity,
            5 => Self::ModExp,
            6 => Self::EcAdd,
            7 => Self::EcMul,
            8 => Self::EcPairing,
            9 => Self::Blake2f,
            _ => return None,
        })
    }

    /// Address of the precompile.
    pub const fn address(self) -> u64 {
        match self {
            Self::EcRecover => 1,
            Self::Sha256 => 2,
            Self::Ripemd160 => 3,
            Self::Identity => 4,
            Self::ModExp => 5,
            Self::EcAdd => 6,
            Self::EcMul => 7,
            Self::EcPairing => 8,
            Self::Blake2f => 9,
        }
    }

    /// Name of the load test method.
    pub const fn method(self) -> &'static str {
        match self {
            Self::EcRecover => "testECRecover",
            Self::Sha256 => "testSHA256",
            Self::Ripemd160 => "testRipemd160",
            Self::Identity => "testIdentity",
            Self::ModExp => "testModExp",
            Self::EcAdd => "testECAdd",
            Self::EcMul => "testECMul",
            Self::EcPairing => "testECPairing",
            Self::Blake2f => "testBlake2f",
        }
    }

    /// Canonical input for the precompile. `ecrecover` input is signed by `signer`.
    pub fn input(self, signer: &Wallet) -> Result<Vec<u8>, ModeError> {
        Ok(match self {
            Self::EcRecover => ec_recover_input(signer)?,
            Self::Sha256 => {
                let mut input = b"Test".to_vec();
                input.resize(32, 0);
                input
            }
            Self::Ripemd160 | Self::Identity => b"Test".to_vec(),
            Self::ModExp => {
                // Base 8, exponent 9, modulus 10, each one byte long.
                let mut input = Vec::with_capacity(99);
                for _ in 0..3 {
                    input.extend_from_slice(&word(1));
                }
                input.extend_from_slice(&[8, 9, 10]);
                input
            }
            Self::EcAdd => [word(1), word(2), word(1), word(2)].concat(),
            Self::EcMul => [word(1), word(2), word(2)].concat(),
            Self::EcPairing => hex::decode(EC_PAIRING_INPUT.concat())?,
            Self::Blake2f => blake2f_input(),
        })
    }

    /// Calldata for the load test method with the canonical input.
    pub fn call(self, signer: &Wallet) -> Result<Bytes, ModeError> {
        let input = self.input(signer)?;
        encode(&format!("{}(bytes)", self.method()), &[AbiValue::Bytes(input)])
    }
}

/// Two valid alt_bn128 pairing pairs, as 32-byte hex words.
const EC_PAIRING_INPUT: [&str; 12] = [
    "2cf44499d5d27bb186308b7af7af02ac5bc9eeb6a3d147c186b21fb1b76e18da",
    "2c0f001f52110ccfe69108924926e45f0b0c868df0e7bde1fe16d3242dc715f6",
    "1fb19bb476f6b9e44e2a32234da8212f61cd63919354bc06aef31e3cfaff3ebc",
    "22606845ff186793914e03e21df544c34ffe2f2f3504de8a79d9159eca2d98d9",
    "2bd368e28381e8eccb5fa81fc26cf3f048eea9abfdd85d7ed3ab3698d63e4f90",
    "2fe02e47887507adf0ff1743cbac6ba291e66f59be6bd763950bb16041a0a85e",
    "0000000000000000000000000000000000000000000000000000000000000001",
    "30644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd45",
    "1971ff0471b09fa93caaf13cbf443c1aede09cc4328f5a62aad45f40ec133eb4",
    "091058a3141822985733cbdddfed0fd8d6c104e9e9eff40bf5abfef9ab163bc7",
    "2a23af9a5ce2ba2796c1f4e453a370eb0af8c212d9dc9acd8fc02c2e907baea2",
    "23a8eb0b0996252cb548a4487da97b02422ebc0e834613f954de6c7e0afdc1fc",
];

fn word(value: u64) -> [u8; 32] {
    U256::from(value).to_be_bytes()
}

/// `hash || v || r || s` for a signature over `keccak256("Test ecRecover")`.
fn ec_recover_input(signer: &Wallet) -> Result<Vec<u8>, ModeError> {
    let hash = keccak256(b"Test ecRecover");
    let signature = signer.sign_hash(&hash)?;
    let v = 27 + u64::from(signature.v());
    let mut input = Vec::with_capacity(128);
    input.extend_from_slice(hash.as_slice());
    input.extend_from_slice(&word(v));
    input.extend_from_slice(&signature.r().to_be_bytes::<32>());
    input.extend_from_slice(&signature.s().to_be_bytes::<32>());
    Ok(input)
}

/// 12 rounds over a fixed state, message, and offset, with the final block flag set.
fn blake2f_input() -> Vec<u8> {
    let mut input = Vec::with_capacity(213);
    input.extend_from_slice(&12u32.to_be_bytes());
    for h in 1..=8u64 {
        input.extend_from_slice(&h.to_le_bytes());
    }
    for m in 1..=16u64 {
        input.extend_from_slice(&m.to_le_bytes());
    }
    for t in 1..=2u64 {
        input.extend_from_slice(&t.to_le_bytes());
    }
    input.push(1);
    input
}

/// Four-byte words the store filler is built from.
const HEXWORDS: [[u8; 4]; 43] = [
    [0x00, 0x0F, 0xF1, 0xCE],
    [0x00, 0xBA, 0xB1, 0x0C],
    [0x1B, 0xAD, 0xB0, 0x02],
    [0x8B, 0xAD, 0xF0, 0x0D],
    [0xAB, 0xAD, 0xBA, 0xBE],
    [0xB1, 0x05, 0xF0, 0x0D],
    [0xB1, 0x6B, 0x00, 0xB5],
    [0x0B, 0x00, 0xB1, 0x35],
    [0xBA, 0xAA, 0xAA, 0xAD],
    [0xBA, 0xAD, 0xF0, 0x0D],
    [0xBA, 0xD2, 0x22, 0x22],
    [0xBA, 0xDD, 0xCA, 0xFE],
    [0xCA, 0xFE, 0xB0, 0xBA],
    [0xB0, 0xBA, 0xBA, 0xBE],
    [0xBE, 0xEF, 0xBA, 0xBE],
    [0xC0, 0x00, 0x10, 0xFF],
    [0xCA, 0xFE, 0xBA, 0xBE],
    [0xCA, 0xFE, 0xD0, 0x0D],
    [0xCE, 0xFA, 0xED, 0xFE],
    [0x0D, 0x15, 0xEA, 0x5E],
    [0xDA, 0xBB, 0xAD, 0x00],
    [0xDE, 0xAD, 0x2B, 0xAD],
    [0xDE, 0xAD, 0xBA, 0xAD],
    [0xDE, 0xAD, 0xBA, 0xBE],
    [0xDE, 0xAD, 0xBE, 0xAF],
    [0xDE, 0xAD, 0xBE, 0xEF],
    [0xDE, 0xAD, 0xC0, 0xDE],
    [0xDE, 0xAD, 0xDE, 0xAD],
    [0xDE, 0xAD, 0xD0, 0x0D],
    [0xDE, 0xAD, 0xFA, 0x11],
    [0xDE, 0xAD, 0x10, 0xCC],
    [0xDE, 0xAD, 0xFE, 0xED],
    [0xDE, 0xCA, 0xFB, 0xAD],
    [0xDE, 0xFE, 0xC8, 0xED],
    [0xD0, 0xD0, 0xCA, 0xCA],
    [0xE0, 0x11, 0xCF, 0xD0],
    [0xFA, 0xCE, 0xFE, 0xED],
    [0xFB, 0xAD, 0xBE, 0xEF],
    [0xFE, 0xE1, 0xDE, 0xAD],
    [0xFE, 0xED, 0xBA, 0xBE],
    [0xFE, 0xED, 0xC0, 0xDE],
    [0xFF, 0xBA, 0xDD, 0x11],
    [0xF0, 0x0D, 0xBA, 0xBE],
];

/// `size` bytes of filler made of words from a fixed list, drawn with `rng`.
pub fn filler<R: Rng + ?Sized>(rng: &mut R, size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size + 4);
    while data.len() < size {
        data.extend_from_slice(&HEXWORDS[rng.gen_range(0..HEXWORDS.len())]);
    }
    data.truncate(size);
    data
}

/// `store(data)`.
pub fn store_call(data: Vec<u8>) -> Result<Bytes, ModeError> {
    encode(STORE_SIGNATURE, &[AbiValue::Bytes(data)])
}

/// `inc()`.
pub fn inc_call() -> Result<Bytes, ModeError> {
    encode(INC_SIGNATURE, &[])
}

/// ERC-20 `transfer(to, amount)`.
pub fn erc20_transfer_call(to: Address, amount: U256) -> Result<Bytes, ModeError> {
    encode(ERC20_TRANSFER_SIGNATURE, &[AbiValue::Address(to), AbiValue::Uint(amount)])
}

/// `balanceOf(owner)`.
pub fn balance_of_call(owner: Address) -> Result<Bytes, ModeError> {
    encode(BALANCE_OF_SIGNATURE, &[AbiValue::Address(owner)])
}

/// ERC-721 `mintBatch(to, amount)`.
pub fn erc721_mint_batch_call(to: Address, amount: u64) -> Result<Bytes, ModeError> {
    encode(ERC721_MINT_BATCH_SIGNATURE, &[AbiValue::Address(to), AbiValue::uint(amount)])
}

/// Arguments of a single-pool exact input swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactInputSingle {
    /// Token sold.
    pub token_in: Address,
    /// Token bought.
    pub token_out: Address,
    /// Pool fee tier.
    pub fee: u32,
    /// Receiver of `token_out`.
    pub recipient: Address,
    /// Amount of `token_in` sold.
    pub amount_in: U256,
    /// Least acceptable amount of `token_out`.
    pub amount_out_minimum: U256,
}

impl ExactInputSingle {
    /// SwapRouter02 calldata, without a price limit.
    pub fn call(&self) -> Result<Bytes, ModeError> {
        let params = AbiValue::Tuple(vec![
            AbiValue::Address(self.token_in),
            AbiValue::Address(self.token_out),
            AbiValue::uint(u64::from(self.fee)),
            AbiValue::Address(self.recipient),
            AbiValue::Uint(self.amount_in),
            AbiValue::Uint(self.amount_out_minimum),
            AbiValue::Uint(U256::ZERO),
        ]);
        encode(EXACT_INPUT_SINGLE_SIGNATURE, &[params])
    }
}

fn encode(signature: &str, args: &[AbiValue]) -> Result<Bytes, ModeError> {
    Ok(Bytes::from(Function::parse(signature)?.encode(args)?))
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng as _, rngs::StdRng};
    use rstest::rstest;
    use surge_abi::selector;

    use super::*;

    #[rstest]
    #[case(0x01, Some("ADD"))]
    #[case(0x3E, Some("RETURNDATACOPY"))]
    #[case(0xA4, Some("LOG4"))]
    #[case(0x5A, Some("GAS"))]
    #[case(0x3C, None)]
    #[case(0xFF, None)]
    fn test_opcode_name(#[case] opcode: u64, #[case] expected: Option<&str>) {
        assert_eq!(opcode_name(opcode), expected);
    }

    #[test]
    fn test_opcode_call_encodes_iterations() {
        let call = opcode_call(0x01, 100).expect("encode");
        assert_eq!(call[..4], selector("testADD(uint256)").expect("selector"));
        assert_eq!(U256::from_be_slice(&call[4..36]), U256::from(100));
        assert!(matches!(opcode_call(0x0C, 1), Err(ModeError::UnknownOpcode(0x0C))));
    }

    #[test]
    fn test_random_opcode_skips_returndatacopy() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen_log4 = false;
        for _ in 0..2_000 {
            let opcode = random_opcode(&mut rng);
            assert_ne!(opcode, 0x3E);
            assert!(opcode_name(opcode).is_some());
            seen_log4 |= opcode == 0xA4;
        }
        assert!(seen_log4);
    }

    #[test]
    fn test_precompile_addresses() {
        for address in 1..=9 {
            let precompile = Precompile::from_address(address).expect("known address");
            assert_eq!(precompile.address(), address);
        }
        assert!(Precompile::from_address(0).is_none());
        assert!(Precompile::from_address(10).is_none());
        assert!(!Precompile::RANDOM_POOL.contains(&Precompile::EcAdd));
        assert!(!Precompile::RANDOM_POOL.contains(&Precompile::EcMul));
    }

    #[rstest]
    #[case(Precompile::EcRecover, 128)]
    #[case(Precompile::Sha256, 32)]
    #[case(Precompile::Ripemd160, 4)]
    #[case(Precompile::Identity, 4)]
    #[case(Precompile::ModExp, 99)]
    #[case(Precompile::EcAdd, 128)]
    #[case(Precompile::EcMul, 96)]
    #[case(Precompile::EcPairing, 384)]
    #[case(Precompile::Blake2f, 213)]
    fn test_precompile_input_lengths(#[case] precompile: Precompile, #[case] len: usize) {
        let input = precompile.input(&Wallet::from_seed(2)).expect("input");
        assert_eq!(input.len(), len);
    }

    #[test]
    fn test_ec_recover_input_layout() {
        let input = Precompile::EcRecover.input(&Wallet::from_seed(2)).expect("input");
        assert_eq!(&input[..32], keccak256(b"Test ecRecover").as_slice());
        let v = U256::from_be_slice(&input[32..64]);
        assert!(v == U256::from(27) || v == U256::from(28));
    }

    #[test]
    fn test_precompile_call_wraps_bytes() {
        let call = Precompile::Identity.call(&Wallet::from_seed(2)).expect("encode");
        let function = Function::parse("testIdentity(bytes)").expect("parse");
        let decoded = function.decode_input(&call).expect("decode");
        assert_eq!(decoded, vec![AbiValue::Bytes(b"Test".to_vec())]);
    }

    #[test]
    fn test_filler_is_deterministic_per_seed() {
        let a = filler(&mut StdRng::seed_from_u64(9), 1025);
        let b = filler(&mut StdRng::seed_from_u64(9), 1025);
        assert_eq!(a.len(), 1025);
        assert_eq!(a, b);
        assert!(a.chunks_exact(4).all(|chunk| HEXWORDS.iter().any(|w| w[..] == chunk[..])));
        assert!(filler(&mut StdRng::seed_from_u64(9), 0).is_empty());
    }

    #[test]
    fn test_token_calls() {
        let to = Address::repeat_byte(0x42);
        let transfer = erc20_transfer_call(to, U256::from(5)).expect("encode");
        assert_eq!(hex::encode(&transfer[..4]), "a9059cbb");
        let balance = balance_of_call(to).expect("encode");
        assert_eq!(balance[..4], BALANCE_OF_SELECTOR);
        let mint = erc721_mint_batch_call(to, 3).expect("encode");
        let decoded = Function::parse(ERC721_MINT_BATCH_SIGNATURE)
            .expect("parse")
            .decode_input(&mint)
            .expect("decode");
        assert_eq!(decoded, vec![AbiValue::Address(to), AbiValue::uint(3)]);
        assert_eq!(selector("tokenURI(uint256)").expect("selector"), TOKEN_URI_SELECTOR);
    }

    #[test]
    fn test_exact_input_single_is_static_tuple() {
        let swap = ExactInputSingle {
            token_in: Address::repeat_byte(1),
            token_out: Address::repeat_byte(2),
            fee: 3_000,
            recipient: Address::repeat_byte(3),
            amount_in: U256::from(1_000),
            amount_out_minimum: U256::ZERO,
        };
        let call = swap.call().expect("encode");
        assert_eq!(call.len(), 4 + 7 * 32);
        assert_eq!(hex::encode(&call[..4]), "04e45aaf");
        assert_eq!(U256::from_be_slice(&call[68..100]), U256::from(3_000));
    }
}
