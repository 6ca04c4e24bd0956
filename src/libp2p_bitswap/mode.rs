// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::atomic::{AtomicU8, Ordering};

use crate::libp2p_bitswap::BitswapError;

/// Lifecycle of a [`crate::libp2p_bitswap::BitswapEngine`].
///
/// Transitions only move forward: `Offline -> Online -> Stopped`. A stopped
/// engine never comes back, a restart needs a new instance.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Mode {
    /// Constructed, the network is not ready yet.
    Offline = 0,
    Online = 1,
    /// Shut down.
    Stopped = 2,
}

impl From<u8> for Mode {
    fn from(value: u8) -> Self {
        match value {
            0 => Mode::Offline,
            1 => Mode::Online,
            _ => Mode::Stopped,
        }
    }
}

#[derive(Debug)]
pub struct ModeGate {
    mode: AtomicU8,
}

impl Default for ModeGate {
    fn default() -> Self {
        Self {
            mode: AtomicU8::new(Mode::Offline as u8),
        }
    }
}

impl ModeGate {
    pub fn mode(&self) -> Mode {
        self.mode.load(Ordering::Acquire).into()
    }

    pub fn is_online(&self) -> bool {
        self.mode() == Mode::Online
    }

    pub fn require_online(&self) -> Result<(), BitswapError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(BitswapError::NotOnline)
        }
    }

    /// Moves `Offline` to `Online`. Returns `false` when the gate was not
    /// offline, including after a shutdown.
    pub fn go_online(&self) -> bool {
        self.mode
            .compare_exchange(
                Mode::Offline as u8,
                Mode::Online as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Moves to `Stopped`. Returns `false` if it was already stopped.
    pub fn stop(&self) -> bool {
        self.mode.swap(Mode::Stopped as u8, Ordering::AcqRel) != Mode::Stopped as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_offline() {
        let gate = ModeGate::default();
        assert_eq!(gate.mode(), Mode::Offline);
        assert!(matches!(
            gate.require_online(),
            Err(BitswapError::NotOnline)
        ));
    }

    #[test]
    fn transitions_are_one_way() {
        let gate = ModeGate::default();
        assert!(gate.go_online());
        assert!(!gate.go_online());
        assert!(gate.require_online().is_ok());

        assert!(gate.stop());
        assert!(!gate.stop());
        assert_eq!(gate.mode(), Mode::Stopped);
        assert!(!gate.go_online());
        assert!(!gate.is_online());
    }

    #[test]
    fn not_online_error_mentions_online_mode() {
        let err = ModeGate::default().require_online().unwrap_err();
        assert!(err.to_string().contains("online mode"));
    }
}
