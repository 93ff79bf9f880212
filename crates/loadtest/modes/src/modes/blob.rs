use alloy_consensus::{TxEip4844, TxEip4844Variant, TxEip4844WithSidecar};
use alloy_eips::eip4844::{
    BlobTransactionSidecar,
    builder::{SidecarBuilder, SimpleCoder},
};
use async_trait::async_trait;
use rand::Rng;
use surge_config::Mode;
use surge_primitives::{Bytes, GWEI, GasPricing, SignedTx, TRANSFER_GAS, TxOptions};

use crate::{Execution, LoadMode, ModeContext, ModeError};

/// Gas limit of a blob transaction. Blob gas is paid separately.
pub const BLOB_GAS_LIMIT: u64 = TRANSFER_GAS;

/// Bytes of random data packed into each blob.
const BLOB_PAYLOAD_SIZE: usize = 31 * 1024;

/// Pseudo-random payload for one blob.
pub fn blob_payload<R: Rng + ?Sized>(rng: &mut R) -> Vec<u8> {
    let mut data = vec![0u8; BLOB_PAYLOAD_SIZE];
    rng.fill(&mut data[..]);
    data
}

/// EIP-4844 transactions carrying one blob of random data.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobMode;

impl BlobMode {
    fn sign(ctx: &ModeContext, opts: &TxOptions) -> Result<SignedTx, ModeError> {
        let GasPricing::Dynamic { max_fee_per_gas, max_priority_fee_per_gas } = opts.pricing else {
            return Err(ModeError::RequiresDynamicFees(Mode::Blob));
        };
        let data = ctx.with_rng(|rng| blob_payload(rng));
        let sidecar: BlobTransactionSidecar = SidecarBuilder::<SimpleCoder>::from_slice(&data)
            .build()
            .map_err(|err| ModeError::Blob(err.to_string()))?;
        let config = ctx.config();
        let tx = TxEip4844 {
            chain_id: opts.chain_id,
            nonce: opts.nonce,
            gas_limit: BLOB_GAS_LIMIT,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            to: ctx.recipient(),
            value: config.transaction.eth_amount_in_wei,
            access_list: Default::default(),
            blob_versioned_hashes: sidecar.versioned_hashes().collect(),
            max_fee_per_blob_gas: u128::from(config.gas.blob_fee_cap_gwei) * GWEI,
            input: Bytes::new(),
        };
        let variant = TxEip4844Variant::TxEip4844WithSidecar(TxEip4844WithSidecar::from_tx_and_sidecar(tx, sidecar));
        Ok(opts.wallet.sign_transaction(variant)?)
    }
}

#[async_trait]
impl LoadMode for BlobMode {
    fn mode(&self) -> Mode {
        Mode::Blob
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        match Self::sign(ctx, &opts) {
            Ok(signed) => ctx.send_signed(signed).await,
            Err(err) => Execution::failed(err),
        }
    }
}
