use proptest::prelude::*;

use splitter_types::{Address, RecipientAddress, TokenAmount, U256};

proptest! {
    /// Lowercase and checksummed spellings parse to the same recipient.
    #[test]
    fn address_spellings_agree(bytes in prop::array::uniform20(0u8..)) {
        let address = Address::from(bytes);
        let checksummed = RecipientAddress::parse(&address.to_checksum(None)).unwrap();
        let lower = RecipientAddress::parse(&format!("0x{}", hex_lower(&bytes))).unwrap();
        prop_assert_eq!(checksummed, lower);
        prop_assert_eq!(lower.as_address(), address);
    }

    /// to_lowercase_hex always yields 42 lowercase characters that parse back.
    #[test]
    fn lowercase_hex_shape(bytes in prop::array::uniform20(0u8..)) {
        let recipient = RecipientAddress::new(Address::from(bytes));
        let hex = recipient.to_lowercase_hex();
        prop_assert_eq!(hex.len(), RecipientAddress::HEX_LEN);
        prop_assert_eq!(hex.to_lowercase(), hex.clone());
        prop_assert_eq!(RecipientAddress::parse(&hex).unwrap(), recipient);
    }

    /// Whole-unit amounts parse to units × 10^decimals.
    #[test]
    fn whole_amount_scales(units in 0u64..1_000_000_000, decimals in 0u8..=24) {
        let amount = TokenAmount::parse(&units.to_string(), decimals).unwrap();
        let expected = U256::from(units) * U256::from(10u64).pow(U256::from(decimals));
        prop_assert_eq!(amount.raw(), expected);
    }

    /// Display output parses back to the same amount.
    #[test]
    fn display_is_parseable(raw in 0u128..u128::MAX, decimals in 0u8..=18) {
        let amount = TokenAmount::new(U256::from(raw), decimals);
        let reparsed = TokenAmount::parse(&amount.to_string(), decimals).unwrap();
        prop_assert_eq!(reparsed, amount);
    }

    /// checked_mul by a count equals repeated addition.
    #[test]
    fn multiply_matches_repeated_add(raw in 1u64..1_000_000_000_000, count in 1usize..50) {
        let amount = TokenAmount::new(U256::from(raw), 18);
        let product = amount.checked_mul(count).unwrap();
        let mut sum = TokenAmount::zero(18);
        for _ in 0..count {
            sum = sum.checked_add(amount).unwrap();
        }
        prop_assert_eq!(product, sum);
    }

    /// A buffer never shrinks an amount.
    #[test]
    fn buffer_is_monotonic(raw in 0u128..u128::MAX, bps in 0u32..10_000) {
        let amount = TokenAmount::new(U256::from(raw), 18);
        let buffered = amount.with_buffer_bps(bps).unwrap();
        prop_assert!(buffered.raw() >= amount.raw());
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
