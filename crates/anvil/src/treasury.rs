use serde::{Deserialize, Serialize};

use crate::{AnvilError, Result};

/// Balance held by a ledger facade
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    balance: u64,
}

impl Treasury {
    pub fn new(balance: u64) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Balance after depositing `amount`, without applying it
    pub fn check_deposit(&self, amount: u64) -> Result<u64> {
        self.balance.checked_add(amount).ok_or(AnvilError::Overflow)
    }

    pub fn deposit(&mut self, amount: u64) -> Result<u64> {
        self.balance = self.check_deposit(amount)?;
        Ok(self.balance)
    }

    pub fn withdraw(&mut self, amount: u64) -> Result<u64> {
        self.balance = self.balance.checked_sub(amount).ok_or(AnvilError::InsufficientFunds {
            requested: amount,
            available: self.balance,
        })?;
        Ok(self.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_then_withdraw() {
        let mut t = Treasury::default();
        assert_eq!(t.deposit(10).unwrap(), 10);
        assert_eq!(t.withdraw(2).unwrap(), 8);
        assert!(matches!(
            t.withdraw(9),
            Err(AnvilError::InsufficientFunds { requested: 9, available: 8 })
        ));
        assert_eq!(t.balance(), 8);
    }

    #[test]
    fn deposit_overflow() {
        let mut t = Treasury::new(u64::MAX);
        assert!(matches!(t.deposit(1), Err(AnvilError::Overflow)));
        assert_eq!(t.balance(), u64::MAX);
    }
}
