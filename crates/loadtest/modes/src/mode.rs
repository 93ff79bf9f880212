//! The mode seam and the per-run registry.

use std::fmt::Debug;

use async_trait::async_trait;
use surge_config::{Config, Mode};
use surge_primitives::TxOptions;
use tracing::info;

use crate::{
    Execution, ModeContext, ModeError,
    modes::{
        BlobMode, ContractCallMode, DeployMode, Erc20Mode, Erc721Mode, IncrementMode, OpcodeMode,
        PrecompileMode, RandomMode, RecallMode, RpcMode, StoreMode, TransferMode, UniswapV3Mode,
    },
};

/// A workload that turns one set of transaction options into one request.
#[async_trait]
pub trait LoadMode: Debug + Send + Sync {
    /// Which mode this is.
    fn mode(&self) -> Mode;

    /// One-time preparation before any worker starts.
    async fn init(&mut self, _ctx: &ModeContext) -> Result<(), ModeError> {
        Ok(())
    }

    /// Builds and delivers one request with the reserved nonce in `opts`.
    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution;
}

/// Instantiates the implementation of `mode`.
pub fn build_mode(mode: Mode, config: &Config) -> Result<Box<dyn LoadMode>, ModeError> {
    Ok(match mode {
        Mode::Transaction => Box::new(TransferMode),
        Mode::Deploy => Box::new(DeployMode::default()),
        Mode::Store => Box::new(StoreMode),
        Mode::Increment => Box::new(IncrementMode),
        Mode::Opcode => Box::new(OpcodeMode::new(config.workload.function)?),
        Mode::Precompile => Box::new(PrecompileMode::new(config.workload.function)?),
        Mode::Erc20 => Box::new(Erc20Mode),
        Mode::Erc721 => Box::new(Erc721Mode),
        Mode::ContractCall => Box::new(ContractCallMode::default()),
        Mode::Recall => Box::new(RecallMode::default()),
        Mode::Rpc => Box::new(RpcMode::default()),
        Mode::Blob => Box::new(BlobMode),
        Mode::Random => Box::new(RandomMode::new(config)?),
        Mode::UniswapV3 => {
            Box::new(UniswapV3Mode::new(config.uniswapv3.clone().ok_or(ModeError::MissingUniswapConfig)?))
        }
    })
}

/// The configured modes, in configuration order.
#[derive(Debug)]
pub struct ModeRegistry {
    modes: Vec<Box<dyn LoadMode>>,
}

impl ModeRegistry {
    /// Builds one implementation per configured mode.
    pub fn from_config(config: &Config) -> Result<Self, ModeError> {
        let modes = config.modes.iter().map(|mode| build_mode(*mode, config)).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { modes })
    }

    /// Prepares every mode. Any failure aborts the run before workers start.
    pub async fn init_all(&mut self, ctx: &ModeContext) -> Result<(), ModeError> {
        for mode in &mut self.modes {
            mode.init(ctx).await?;
            info!(mode = %mode.mode(), "Initialized mode");
        }
        Ok(())
    }

    /// Configured modes.
    pub fn modes(&self) -> impl Iterator<Item = Mode> + '_ {
        self.modes.iter().map(|mode| mode.mode())
    }

    /// Number of configured modes.
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    /// Whether no mode is configured.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Mode for a request. A single mode always runs; several rotate by worker and request.
    pub fn select(&self, worker_id: u64, request_id: u64) -> Option<&dyn LoadMode> {
        let len = self.modes.len() as u64;
        if len == 0 {
            return None;
        }
        let index = worker_id.wrapping_add(request_id) % len;
        self.modes.get(index as usize).map(Box::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn registry(modes: &[Mode]) -> ModeRegistry {
        ModeRegistry::from_config(&Config::default().with_modes(modes.to_vec())).expect("registry")
    }

    #[test]
    fn test_single_mode_always_selected() {
        let registry = registry(&[Mode::Store]);
        for (worker, request) in [(0, 0), (3, 7), (9, 1)] {
            assert_eq!(registry.select(worker, request).map(|m| m.mode()), Some(Mode::Store));
        }
    }

    #[rstest]
    #[case(0, 0, Mode::Transaction)]
    #[case(0, 1, Mode::Erc20)]
    #[case(1, 1, Mode::Store)]
    #[case(2, 2, Mode::Erc20)]
    fn test_modes_rotate(#[case] worker: u64, #[case] request: u64, #[case] expected: Mode) {
        let registry = registry(&[Mode::Transaction, Mode::Erc20, Mode::Store]);
        assert_eq!(registry.select(worker, request).map(|m| m.mode()), Some(expected));
    }

    #[test]
    fn test_empty_registry_selects_nothing() {
        let registry = registry(&[]);
        assert!(registry.is_empty());
        assert!(registry.select(0, 0).is_none());
    }

    #[test]
    fn test_uniswap_requires_settings() {
        let err = ModeRegistry::from_config(&Config::default().with_modes(vec![Mode::UniswapV3]))
            .expect_err("missing settings");
        assert!(matches!(err, ModeError::MissingUniswapConfig));
    }

    #[test]
    fn test_fixed_opcode_is_checked_up_front() {
        let mut config = Config::default().with_modes(vec![Mode::Opcode]);
        config.workload.function = Some(0x0C);
        assert!(matches!(ModeRegistry::from_config(&config), Err(ModeError::UnknownOpcode(0x0C))));
        config.workload.function = Some(0x01);
        assert_eq!(ModeRegistry::from_config(&config).expect("valid").modes().collect::<Vec<_>>(), vec![
            Mode::Opcode
        ]);
    }
}
