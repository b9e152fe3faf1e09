//! Reconciling amount input with the recipient list.

use alloy_primitives::U256;
use splitter_types::{SplitKind, TokenAmount};

use crate::address_book::tokenize;
use crate::error::SplitError;

/// Base-unit amounts ready for the splitter contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitAmounts {
    pub kind: SplitKind,
    /// One entry per recipient, positionally aligned with the recipient list.
    pub per_recipient: Vec<U256>,
    pub total: U256,
    pub decimals: u8,
}

impl SplitAmounts {
    pub fn total_amount(&self) -> TokenAmount {
        TokenAmount::new(self.total, self.decimals)
    }
}

/// Equal split: `amount_each` to every one of `recipients` recipients.
pub fn equal(amount_each: &str, decimals: u8, recipients: usize) -> Result<SplitAmounts, SplitError> {
    if recipients == 0 {
        return Err(SplitError::InputValidation("no recipients".into()));
    }
    let each = TokenAmount::parse(amount_each, decimals)?;
    if each.is_zero() {
        return Err(SplitError::InputValidation(
            "amount per recipient must be greater than zero".into(),
        ));
    }
    let total = each.checked_mul(recipients).ok_or_else(|| {
        SplitError::InputValidation(format!("{each} × {recipients} overflows"))
    })?;

    Ok(SplitAmounts {
        kind: SplitKind::Equal,
        per_recipient: vec![each.raw(); recipients],
        total: total.raw(),
        decimals,
    })
}

/// Parse a comma/whitespace separated list of strictly positive amounts.
///
/// The first bad entry rejects the whole list.
pub fn parse_amount_list(text: &str, decimals: u8) -> Result<Vec<TokenAmount>, SplitError> {
    tokenize(text)
        .enumerate()
        .map(|(i, entry)| {
            let amount = TokenAmount::parse(entry, decimals).map_err(|e| {
                SplitError::InputValidation(format!("amount #{}: {e}", i + 1))
            })?;
            if amount.is_zero() {
                return Err(SplitError::InputValidation(format!(
                    "amount #{} must be greater than zero",
                    i + 1
                )));
            }
            Ok(amount)
        })
        .collect()
}

/// Unequal split: the n-th amount in `csv` pays the n-th recipient.
pub fn unequal(csv: &str, decimals: u8, recipients: usize) -> Result<SplitAmounts, SplitError> {
    if recipients == 0 {
        return Err(SplitError::InputValidation("no recipients".into()));
    }
    let amounts = parse_amount_list(csv, decimals)?;
    if amounts.len() != recipients {
        return Err(SplitError::InputValidation(format!(
            "{} amounts for {} recipients",
            amounts.len(),
            recipients
        )));
    }

    let total = amounts
        .iter()
        .try_fold(U256::ZERO, |acc, a| acc.checked_add(a.raw()))
        .ok_or_else(|| SplitError::InputValidation("sum of amounts overflows".into()))?;

    Ok(SplitAmounts {
        kind: SplitKind::Unequal,
        per_recipient: amounts.iter().map(TokenAmount::raw).collect(),
        total,
        decimals,
    })
}

/// Dispatch on `kind`; `text` is the shared amount or the amount list.
pub fn reconcile(
    kind: SplitKind,
    text: &str,
    decimals: u8,
    recipients: usize,
) -> Result<SplitAmounts, SplitError> {
    match kind {
        SplitKind::Equal => equal(text, decimals, recipients),
        SplitKind::Unequal => unequal(text, decimals, recipients),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth(units: u64) -> U256 {
        TokenAmount::ether(units).raw()
    }

    #[test]
    fn equal_total_is_exact_product() {
        for count in [1usize, 5, 100] {
            let amounts = equal("0.1", 18, count).unwrap();
            assert_eq!(amounts.per_recipient.len(), count);
            assert_eq!(
                amounts.total,
                U256::from(100_000_000_000_000_000u64) * U256::from(count)
            );
        }
    }

    #[test]
    fn equal_rejects_zero_and_garbage() {
        assert!(equal("0", 18, 2).is_err());
        assert!(equal("-1", 18, 2).is_err());
        assert!(equal("", 18, 2).is_err());
        assert!(equal("1", 18, 0).is_err());
    }

    #[test]
    fn unequal_requires_alignment() {
        let ok = unequal("1, 0.5, 2", 18, 3).unwrap();
        assert_eq!(ok.total, eth(3) + U256::from(500_000_000_000_000_000u64));
        assert_eq!(ok.per_recipient[1], U256::from(500_000_000_000_000_000u64));

        assert!(unequal("1, 0.5", 18, 3).is_err());
        assert!(unequal("1, 0.5, 2, 4", 18, 3).is_err());
    }

    #[test]
    fn one_bad_value_rejects_the_batch() {
        assert!(unequal("1, 0, 2", 18, 3).is_err());
        assert!(unequal("1, x, 2", 18, 3).is_err());
        assert!(unequal("1 -2 3", 18, 3).is_err());
    }

    #[test]
    fn newline_and_space_separators_work() {
        let amounts = unequal("1\n2 3", 6, 3).unwrap();
        assert_eq!(amounts.total, U256::from(6_000_000u64));
        assert_eq!(amounts.total_amount().to_string(), "6");
    }

    #[test]
    fn equal_overflow_is_an_input_error() {
        let huge = "9".repeat(77);
        assert!(matches!(
            equal(&huge, 0, 100),
            Err(SplitError::InputValidation(_))
        ));
    }
}
