use std::fmt;

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

/// Chain head data the relay needs from a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    /// Absent on chains without EIP-1559.
    pub base_fee_per_gas: Option<u128>,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub timestamp: u64,
    #[serde(default)]
    pub transactions: Vec<B256>,
}

impl Block {
    pub fn is_full(&self) -> bool {
        self.gas_used >= self.gas_limit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Number(u64),
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockTag::Latest => write!(f, "latest"),
            BlockTag::Number(number) => write!(f, "{:#x}", number),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_tag_display() {
        assert_eq!(BlockTag::Latest.to_string(), "latest");
        assert_eq!(BlockTag::Number(255).to_string(), "0xff");
    }
}
