//! Token amounts.
//!
//! Amounts are represented as integer base units (`U256`) plus the token's
//! `decimals`, so display text like `"0.5"` converts exactly and sums and
//! products never pick up floating-point error.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SplitterError;

/// An exact amount of ETH or of an ERC20 token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    raw: U256,
    decimals: u8,
}

impl TokenAmount {
    /// Decimals of the native currency.
    pub const ETH_DECIMALS: u8 = 18;

    /// Largest `decimals` a token may declare; 10^77 is the biggest power of ten in 256 bits.
    pub const MAX_DECIMALS: u8 = 77;

    pub fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self::new(U256::ZERO, decimals)
    }

    /// Whole ETH (or whole tokens of 18 decimals).
    pub fn ether(units: u64) -> Self {
        let raw = U256::from(units) * unit(Self::ETH_DECIMALS);
        Self::new(raw, Self::ETH_DECIMALS)
    }

    /// Parse a decimal string in display units.
    ///
    /// Accepts digits with at most one `.` and at most `decimals` fractional digits.
    /// Signs, exponents, thousands separators and empty input are rejected.
    pub fn parse(text: &str, decimals: u8) -> Result<Self, SplitterError> {
        let input = text.trim();
        let invalid = |reason: &str| SplitterError::InvalidAmount {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if decimals > Self::MAX_DECIMALS {
            return Err(invalid("token declares too many decimals"));
        }
        if input.is_empty() {
            return Err(invalid("empty"));
        }

        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("no digits"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("not a decimal number"));
        }
        if frac.len() > decimals as usize {
            return Err(invalid("too many fractional digits"));
        }

        let whole = parse_digits(whole)?;
        let frac_padded = format!("{:0<width$}", frac, width = decimals as usize);
        let frac = parse_digits(&frac_padded)?;

        let raw = whole
            .checked_mul(unit(decimals))
            .and_then(|w| w.checked_add(frac))
            .ok_or(SplitterError::AmountOverflow)?;

        Ok(Self::new(raw, decimals))
    }

    /// Base units.
    pub fn raw(&self) -> U256 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        if self.decimals != other.decimals {
            return None;
        }
        self.raw
            .checked_add(other.raw)
            .map(|raw| Self::new(raw, self.decimals))
    }

    /// Multiply by a recipient count.
    pub fn checked_mul(self, count: usize) -> Option<Self> {
        self.raw
            .checked_mul(U256::from(count))
            .map(|raw| Self::new(raw, self.decimals))
    }

    /// This amount increased by `bps` basis points (rounded down).
    pub fn with_buffer_bps(self, bps: u32) -> Option<Self> {
        let scaled = self.raw.checked_mul(U256::from(10_000u64 + u64::from(bps)))?;
        Some(Self::new(scaled / U256::from(10_000u64), self.decimals))
    }

    /// Render in display units without trailing fractional zeros.
    pub fn to_display_string(&self) -> String {
        let unit = unit(self.decimals);
        let whole = self.raw / unit;
        let frac = self.raw % unit;
        if frac.is_zero() {
            return whole.to_string();
        }
        let frac = format!("{:0>width$}", frac.to_string(), width = self.decimals as usize);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

/// 10^decimals.
fn unit(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

fn parse_digits(digits: &str) -> Result<U256, SplitterError> {
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| SplitterError::AmountOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional() {
        let one = TokenAmount::parse("1", 18).unwrap();
        assert_eq!(one, TokenAmount::ether(1));

        let half = TokenAmount::parse("0.5", 18).unwrap();
        assert_eq!(half.raw(), U256::from(500_000_000_000_000_000u64));

        let usdc = TokenAmount::parse("12.345678", 6).unwrap();
        assert_eq!(usdc.raw(), U256::from(12_345_678u64));
    }

    #[test]
    fn accepts_bare_leading_or_trailing_point() {
        assert_eq!(TokenAmount::parse(".5", 1).unwrap().raw(), U256::from(5u64));
        assert_eq!(TokenAmount::parse("5.", 1).unwrap().raw(), U256::from(50u64));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", " ", ".", "-1", "+1", "1e18", "1,5", "1.2.3", "abc", "0x10"] {
            assert!(TokenAmount::parse(bad, 18).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn rejects_excess_precision() {
        assert!(TokenAmount::parse("0.1234567", 6).is_err());
        assert!(TokenAmount::parse("1.5", 0).is_err());
    }

    #[test]
    fn zero_parses_but_is_zero() {
        assert!(TokenAmount::parse("0.000", 18).unwrap().is_zero());
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(TokenAmount::parse("2.500", 18).unwrap().to_string(), "2.5");
        assert_eq!(TokenAmount::parse("3", 6).unwrap().to_string(), "3");
        assert_eq!(TokenAmount::new(U256::from(1u64), 18).to_string(), "0.000000000000000001");
    }

    #[test]
    fn buffer_adds_one_percent() {
        let amount = TokenAmount::parse("100", 18).unwrap();
        let buffered = amount.with_buffer_bps(100).unwrap();
        assert_eq!(buffered, TokenAmount::parse("101", 18).unwrap());
    }

    #[test]
    fn checked_add_refuses_mixed_decimals() {
        let a = TokenAmount::parse("1", 18).unwrap();
        let b = TokenAmount::parse("1", 6).unwrap();
        assert!(a.checked_add(b).is_none());
    }

    #[test]
    fn overflow_is_reported() {
        let huge = "9".repeat(80);
        assert_eq!(
            TokenAmount::parse(&huge, 18),
            Err(SplitterError::AmountOverflow)
        );
    }
}
