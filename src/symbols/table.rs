//! Symbol table with label, value and address indexes.
//!
//! Labels are unique and map to exactly one symbol. Addresses do not: a
//! project definition, a platform definition and a user label may all claim
//! the same location. The address indexes keep only the preferred claimant
//! for each address, one index for reads and one for writes, so lookups are a
//! single map probe. Definitions with an address mask are kept per mask and
//! searched only when the main indexes miss.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::core::symbol::{
    compare_priority, DirectionFlags, LabelAnnotation, MultiAddressMask, Symbol, SymbolSource,
    SymbolType, TableSymbol,
};
use crate::error::{Glaurung65Error, Result};

/// Highest numeric suffix tried when generating a unique label.
pub const MAX_UNIQUE_SUFFIX: usize = 999;

type ValueKey = (u32, SymbolSource, String);

fn value_key(sym: &TableSymbol) -> ValueKey {
    (sym.value, sym.source, sym.label.clone())
}

/// Dual-indexed symbol registry.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    by_label: BTreeMap<String, Arc<TableSymbol>>,
    by_value: BTreeMap<ValueKey, Arc<TableSymbol>>,
    by_read_addr: BTreeMap<u32, Arc<TableSymbol>>,
    by_write_addr: BTreeMap<u32, Arc<TableSymbol>>,
    mask_groups: BTreeMap<MultiAddressMask, Vec<Arc<TableSymbol>>>,
    change_serial: u64,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incremented by every mutation.
    pub fn change_serial(&self) -> u64 {
        self.change_serial
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }

    /// Symbols in label order.
    pub fn iter(&self) -> impl Iterator<Item = &TableSymbol> {
        self.by_label.values().map(|s| s.as_ref())
    }

    pub fn get(&self, label: &str) -> Option<&TableSymbol> {
        self.by_label.get(label).map(|s| s.as_ref())
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.by_label.contains_key(label)
    }

    pub fn clear(&mut self) {
        self.by_label.clear();
        self.by_value.clear();
        self.by_read_addr.clear();
        self.by_write_addr.clear();
        self.mask_groups.clear();
        self.change_serial += 1;
    }

    /// Add a symbol.
    ///
    /// # Errors
    /// Returns [`Glaurung65Error::DuplicateLabel`] if the label is taken.
    pub fn add(&mut self, sym: impl Into<TableSymbol>) -> Result<()> {
        let sym = Arc::new(sym.into());
        if self.by_label.contains_key(&sym.label) {
            return Err(Glaurung65Error::DuplicateLabel(sym.label.clone()));
        }
        self.insert(sym);
        Ok(())
    }

    /// Add a symbol, replacing any symbol with the same label.
    pub fn set(&mut self, sym: impl Into<TableSymbol>) {
        let sym = Arc::new(sym.into());
        let replaced = self.by_label.contains_key(&sym.label);
        if replaced {
            self.remove(&sym.label);
        }
        self.insert(sym);
    }

    /// Remove the symbol with `label`, returning it.
    pub fn remove(&mut self, label: &str) -> Option<Arc<TableSymbol>> {
        let sym = self.by_label.remove(label)?;
        self.by_value.remove(&value_key(&sym));
        self.change_serial += 1;

        if matches!(sym.source, SymbolSource::User | SymbolSource::Auto)
            && sym.multi_mask().is_none()
            && sym.width() == 1
        {
            // Point delete. Rebuild only if the label was hiding another claim.
            let addr = sym.value;
            let shadowing = |m: &BTreeMap<u32, Arc<TableSymbol>>| {
                m.get(&addr).is_some_and(|s| Arc::ptr_eq(s, &sym))
            };
            let hid_read = shadowing(&self.by_read_addr);
            let hid_write = shadowing(&self.by_write_addr);
            if hid_read {
                self.by_read_addr.remove(&addr);
            }
            if hid_write {
                self.by_write_addr.remove(&addr);
            }
            if (hid_read || hid_write) && self.any_other_claims(addr) {
                self.rebuild_address_index();
            }
        } else {
            self.rebuild_address_index();
        }
        Some(sym)
    }

    fn any_other_claims(&self, addr: u32) -> bool {
        self.by_label.values().any(|s| {
            Self::is_addressable(s)
                && s.multi_mask().is_none()
                && covered_addrs(s).any(|a| a == addr)
        })
    }

    fn insert(&mut self, sym: Arc<TableSymbol>) {
        trace!(label = %sym.label, value = sym.value, "symbol added");
        self.by_label.insert(sym.label.clone(), Arc::clone(&sym));
        self.by_value.insert(value_key(&sym), Arc::clone(&sym));
        self.add_address_entries(&sym);
        self.change_serial += 1;
    }

    fn is_addressable(sym: &TableSymbol) -> bool {
        sym.source != SymbolSource::Variable && sym.sym_type != SymbolType::Constant
    }

    fn add_address_entries(&mut self, sym: &Arc<TableSymbol>) {
        if !Self::is_addressable(sym) {
            return;
        }
        if let Some(mask) = sym.multi_mask() {
            self.mask_groups
                .entry(*mask)
                .or_default()
                .push(Arc::clone(sym));
            return;
        }
        let dir = sym.direction();
        for addr in covered_addrs(sym) {
            if dir.contains(DirectionFlags::READ) {
                claim(&mut self.by_read_addr, addr, sym);
            }
            if dir.contains(DirectionFlags::WRITE) {
                claim(&mut self.by_write_addr, addr, sym);
            }
        }
    }

    /// Rebuild the address indexes from the label index.
    fn rebuild_address_index(&mut self) {
        debug!(symbols = self.by_label.len(), "rebuilding symbol address index");
        self.by_read_addr.clear();
        self.by_write_addr.clear();
        self.mask_groups.clear();
        let all: Vec<Arc<TableSymbol>> = self.by_label.values().cloned().collect();
        for sym in &all {
            self.add_address_entries(sym);
        }
    }

    /// First symbol whose value is exactly `value`, skipping constants.
    /// Candidates are taken in source priority order.
    pub fn find_address_by_value(&self, value: u32) -> Option<&TableSymbol> {
        self.by_value
            .range((value, SymbolSource::User, String::new())..)
            .take_while(|((v, _, _), _)| *v == value)
            .map(|(_, s)| s.as_ref())
            .find(|s| s.sym_type != SymbolType::Constant)
    }

    /// Preferred non-variable symbol covering `addr`.
    ///
    /// `access` selects the index: reads, writes, or both (read first) when
    /// both bits or neither are given.
    pub fn find_non_variable_by_address(
        &self,
        addr: u32,
        access: DirectionFlags,
    ) -> Option<&TableSymbol> {
        let (try_read, try_write) = if access == DirectionFlags::READ {
            (true, false)
        } else if access == DirectionFlags::WRITE {
            (false, true)
        } else {
            (true, true)
        };

        let mut found = None;
        if try_read {
            found = self.by_read_addr.get(&addr);
        }
        if found.is_none() && try_write {
            found = self.by_write_addr.get(&addr);
        }
        if let Some(sym) = found {
            return Some(sym.as_ref());
        }

        let mut best: Option<&Arc<TableSymbol>> = None;
        for (mask, group) in &self.mask_groups {
            if !mask.matches(addr) {
                continue;
            }
            let masked = addr & mask.address_mask;
            for sym in group {
                let dir = sym.direction();
                let dir_ok = (try_read && dir.contains(DirectionFlags::READ))
                    || (try_write && dir.contains(DirectionFlags::WRITE));
                if !dir_ok {
                    continue;
                }
                let start = sym.value & mask.address_mask;
                if masked < start || (masked - start) as usize >= sym.width() {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some(cur) => compare_priority(sym, cur, addr) == Ordering::Less,
                };
                if better {
                    best = Some(sym);
                }
            }
        }
        best.map(|s| s.as_ref())
    }

    /// Build an auto label for `addr` that does not collide with anything in
    /// the table: `prefix` plus the address in hex, then `_0`, `_1`, ... on
    /// collision.
    ///
    /// # Errors
    /// Returns [`Glaurung65Error::LabelExhausted`] once every suffix up to
    /// [`MAX_UNIQUE_SUFFIX`] is taken.
    pub fn generate_unique_for_address(&self, addr: u32, prefix: &str) -> Result<Symbol> {
        let base = format!("{}{:04X}", prefix, addr);
        let label = if !self.contains_label(&base) {
            base
        } else {
            (0..=MAX_UNIQUE_SUFFIX)
                .map(|i| format!("{}_{}", base, i))
                .find(|l| !self.contains_label(l))
                .ok_or_else(|| Glaurung65Error::LabelExhausted(base.clone()))?
        };
        Symbol::new(
            label,
            addr,
            SymbolSource::Auto,
            SymbolType::LocalOrGlobalAddr,
            LabelAnnotation::None,
        )
    }
}

/// Addresses covered by a symbol, wrapping within its 64KB bank.
fn covered_addrs(sym: &TableSymbol) -> impl Iterator<Item = u32> {
    let value = sym.value;
    let bank = value & 0xffff_0000;
    let width = sym.width().min(0x10000) as u32;
    (0..width).map(move |i| bank | (value.wrapping_add(i) & 0xffff))
}

fn claim(index: &mut BTreeMap<u32, Arc<TableSymbol>>, addr: u32, sym: &Arc<TableSymbol>) {
    match index.get(&addr) {
        Some(cur) if compare_priority(sym, cur, addr) != Ordering::Less => {}
        _ => {
            index.insert(addr, Arc::clone(sym));
        }
    }
}
