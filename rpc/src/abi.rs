//! ABI bindings and calldata helpers.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

sol! {
    /// The subset of ERC20 the splitter reads and approves through.
    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

sol! {
    /// The deployed splitter contract.
    #[derive(Debug, PartialEq, Eq)]
    interface ITokenSplitter {
        function splitETH(address[] recipients, uint256[] amounts) external payable;
        function splitEqualETH(address[] recipients) external payable;
        function splitERC20(address token, address[] recipients, uint256[] amounts) external;
        function splitEqualERC20(address token, address[] recipients, uint256 totalAmount) external;
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IEnsRegistry {
        function resolver(bytes32 node) external view returns (address);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IEnsResolver {
        function addr(bytes32 node) external view returns (address);
        function name(bytes32 node) external view returns (string);
    }
}

/// A decoded call to the splitter contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SplitCall {
    EqualEth {
        recipients: Vec<Address>,
    },
    Eth {
        recipients: Vec<Address>,
        amounts: Vec<U256>,
    },
    EqualErc20 {
        token: Address,
        recipients: Vec<Address>,
        total: U256,
    },
    Erc20 {
        token: Address,
        recipients: Vec<Address>,
        amounts: Vec<U256>,
    },
}

impl SplitCall {
    pub fn encode(&self) -> Bytes {
        let data = match self.clone() {
            Self::EqualEth { recipients } => {
                ITokenSplitter::splitEqualETHCall { recipients }.abi_encode()
            }
            Self::Eth {
                recipients,
                amounts,
            } => ITokenSplitter::splitETHCall {
                recipients,
                amounts,
            }
            .abi_encode(),
            Self::EqualErc20 {
                token,
                recipients,
                total,
            } => ITokenSplitter::splitEqualERC20Call {
                token,
                recipients,
                totalAmount: total,
            }
            .abi_encode(),
            Self::Erc20 {
                token,
                recipients,
                amounts,
            } => ITokenSplitter::splitERC20Call {
                token,
                recipients,
                amounts,
            }
            .abi_encode(),
        };
        data.into()
    }

    /// Decode splitter calldata; `None` if the selector is not a split function.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if let Ok(call) = ITokenSplitter::splitEqualETHCall::abi_decode(data, true) {
            return Some(Self::EqualEth {
                recipients: call.recipients,
            });
        }
        if let Ok(call) = ITokenSplitter::splitETHCall::abi_decode(data, true) {
            return Some(Self::Eth {
                recipients: call.recipients,
                amounts: call.amounts,
            });
        }
        if let Ok(call) = ITokenSplitter::splitEqualERC20Call::abi_decode(data, true) {
            return Some(Self::EqualErc20 {
                token: call.token,
                recipients: call.recipients,
                total: call.totalAmount,
            });
        }
        if let Ok(call) = ITokenSplitter::splitERC20Call::abi_decode(data, true) {
            return Some(Self::Erc20 {
                token: call.token,
                recipients: call.recipients,
                amounts: call.amounts,
            });
        }
        None
    }

    pub fn recipients(&self) -> &[Address] {
        match self {
            Self::EqualEth { recipients }
            | Self::Eth { recipients, .. }
            | Self::EqualErc20 { recipients, .. }
            | Self::Erc20 { recipients, .. } => recipients,
        }
    }

}

pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    IERC20::approveCall { spender, amount }.abi_encode().into()
}

/// Decode ERC20 `approve` calldata into `(spender, amount)`.
pub fn decode_approve(data: &[u8]) -> Option<(Address, U256)> {
    IERC20::approveCall::abi_decode(data, true)
        .ok()
        .map(|call| (call.spender, call.amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    #[test]
    fn split_calls_survive_encode_decode() {
        let calls = [
            SplitCall::EqualEth {
                recipients: vec![addr(1), addr(2)],
            },
            SplitCall::Erc20 {
                token: addr(9),
                recipients: vec![addr(1), addr(2), addr(3)],
                amounts: vec![U256::from(1u64), U256::from(2u64), U256::from(3u64)],
            },
        ];
        for call in calls {
            assert_eq!(SplitCall::decode(&call.encode()), Some(call));
        }
    }

    #[test]
    fn approve_is_not_a_split() {
        let data = encode_approve(addr(7), U256::from(100u64));
        assert_eq!(SplitCall::decode(&data), None);
        assert_eq!(decode_approve(&data), Some((addr(7), U256::from(100u64))));
    }

    #[test]
    fn selectors_match_the_deployed_contract() {
        assert_eq!(
            ITokenSplitter::splitEqualETHCall::SIGNATURE,
            "splitEqualETH(address[])"
        );
        assert_eq!(
            ITokenSplitter::splitEqualERC20Call::SIGNATURE,
            "splitEqualERC20(address,address[],uint256)"
        );
        assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
    }
}
