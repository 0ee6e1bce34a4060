//! Calculator-style memory register (M+ / M- / MR / MC)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::Stat;

/// Memory key operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryOp {
    #[serde(alias = "m+")]
    Add,
    #[serde(alias = "m-")]
    Subtract,
    #[serde(alias = "mr")]
    Recall,
    #[serde(alias = "mc")]
    Clear,
}

impl fmt::Display for MemoryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemoryOp::Add => "M+",
            MemoryOp::Subtract => "M-",
            MemoryOp::Recall => "MR",
            MemoryOp::Clear => "MC",
        })
    }
}

/// Stored value plus the stat it was last drawn from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegister {
    pub value: i32,
    pub source: Option<Stat>,
}

impl MemoryRegister {
    pub fn add(&mut self, amount: i32, source: Stat) -> i32 {
        self.value = self.value.saturating_add(amount.max(0));
        self.source = Some(source);
        self.value
    }

    /// Subtract, flooring the register at zero
    pub fn subtract(&mut self, amount: i32, source: Stat) -> i32 {
        self.value = (self.value - amount.max(0)).max(0);
        self.source = Some(source);
        self.value
    }

    pub fn clear(&mut self) {
        self.value = 0;
        self.source = None;
    }

    /// Buff size granted by a recall (half the stored value)
    pub fn recall_amount(&self) -> i32 {
        self.value / 2
    }

    pub fn is_empty(&self) -> bool {
        self.value == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_recall_half() {
        let mut memory = MemoryRegister::default();
        memory.add(40, Stat::Attack);
        assert_eq!(memory.value, 40);
        assert_eq!(memory.source, Some(Stat::Attack));
        assert_eq!(memory.recall_amount(), 20);
    }

    #[test]
    fn test_subtract_floors_at_zero() {
        let mut memory = MemoryRegister::default();
        memory.add(10, Stat::Defense);
        assert_eq!(memory.subtract(25, Stat::Speed), 0);
        assert_eq!(memory.source, Some(Stat::Speed));
    }

    #[test]
    fn test_clear_resets() {
        let mut memory = MemoryRegister::default();
        memory.add(12, Stat::Magic);
        memory.clear();
        assert!(memory.is_empty());
        assert_eq!(memory.source, None);
        assert_eq!(memory.recall_amount(), 0);
    }

    #[test]
    fn test_op_aliases_parse() {
        let op: MemoryOp = serde_json::from_str("\"m+\"").unwrap();
        assert_eq!(op, MemoryOp::Add);
        let op: MemoryOp = serde_json::from_str("\"clear\"").unwrap();
        assert_eq!(op, MemoryOp::Clear);
        assert_eq!(MemoryOp::Recall.to_string(), "MR");
    }
}
