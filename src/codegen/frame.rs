use std::collections::HashMap;

use super::Instruction;

/// Name of the synthetic slot holding a function's result.
pub const RETURN_SLOT: &str = "$return";

/// Offsets of the names visible in one memory region: the global segment
/// at top level, or the frame of the subprogram being generated.
///
/// Parameters sit below the frame pointer (-1, -2, ...), locals above it
/// starting at 0.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    offsets: HashMap<String, i64>,
    next_offset: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Local(i64),
    Global(i64),
}

impl Slot {
    pub fn offset(self) -> i64 {
        match self {
            Slot::Local(o) | Slot::Global(o) => o,
        }
    }

    pub fn push(self) -> Instruction {
        match self {
            Slot::Local(o) => Instruction::PushL(o),
            Slot::Global(o) => Instruction::PushG(o),
        }
    }

    pub fn store(self) -> Instruction {
        match self {
            Slot::Local(o) => Instruction::StoreL(o),
            Slot::Global(o) => Instruction::StoreG(o),
        }
    }

    pub fn base(self) -> Instruction {
        match self {
            Slot::Local(_) => Instruction::PushFp,
            Slot::Global(_) => Instruction::PushGp,
        }
    }
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last parameter lands at -1, the first at `-params.len()`.
    pub fn bind_params(&mut self, params: &[&str]) {
        for (i, name) in params.iter().rev().enumerate() {
            self.offsets
                .insert(name.to_ascii_lowercase(), -(i as i64) - 1);
        }
    }

    pub fn allocate(&mut self, name: &str, slots: i64) -> i64 {
        let offset = self.next_offset;
        self.offsets.insert(name.to_ascii_lowercase(), offset);
        self.next_offset += slots;
        offset
    }

    /// Reserves the result slot and aliases the function's own name to it.
    pub fn reserve_return_slot(&mut self, function: &str) -> i64 {
        let offset = self.allocate(RETURN_SLOT, 1);
        self.offsets.insert(function.to_ascii_lowercase(), offset);
        offset
    }

    pub fn return_slot(&self) -> Option<i64> {
        self.offsets.get(RETURN_SLOT).copied()
    }

    pub fn offset(&self, name: &str) -> Option<i64> {
        self.offsets.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn in_function(&self) -> bool {
        self.offsets.contains_key(RETURN_SLOT)
    }

    /// Frame-relative inside a function body, and always for parameters.
    pub fn slot(&self, name: &str) -> Option<Slot> {
        let offset = self.offset(name)?;
        if offset < 0 || self.in_function() {
            Some(Slot::Local(offset))
        } else {
            Some(Slot::Global(offset))
        }
    }
}
