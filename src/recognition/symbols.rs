// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class symbol table
//!
//! Maps classifier class ids to Arabic fingerspelling glyphs. Lookups are
//! bounds-checked; anything outside the table resolves to [`UNKNOWN_SYMBOL`].

use rand::Rng;

/// Displayed when no symbol can be emitted ("unknown")
pub const UNKNOWN_SYMBOL: &str = "غير معروف";

/// A displayable sign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignSymbol {
    /// Glyph shown to the user
    pub glyph: &'static str,
    /// English pronunciation of the letter name
    pub name: &'static str,
}

const ARABIC_ALPHABET: [SignSymbol; 32] = [
    SignSymbol { glyph: "ع", name: "ain" },
    SignSymbol { glyph: "ال", name: "al" },
    SignSymbol { glyph: "أ", name: "aleff" },
    SignSymbol { glyph: "ب", name: "bb" },
    SignSymbol { glyph: "د", name: "dal" },
    SignSymbol { glyph: "ظ", name: "dha" },
    SignSymbol { glyph: "ض", name: "dhad" },
    SignSymbol { glyph: "ف", name: "fa" },
    SignSymbol { glyph: "ق", name: "gaaf" },
    SignSymbol { glyph: "غ", name: "ghain" },
    SignSymbol { glyph: "هـ", name: "ha" },
    SignSymbol { glyph: "ح", name: "haa" },
    SignSymbol { glyph: "ج", name: "jeem" },
    SignSymbol { glyph: "ك", name: "kaaf" },
    SignSymbol { glyph: "خ", name: "khaa" },
    SignSymbol { glyph: "لا", name: "la" },
    SignSymbol { glyph: "ل", name: "laam" },
    SignSymbol { glyph: "م", name: "meem" },
    SignSymbol { glyph: "ن", name: "nun" },
    SignSymbol { glyph: "ر", name: "ra" },
    SignSymbol { glyph: "ص", name: "saad" },
    SignSymbol { glyph: "س", name: "seen" },
    SignSymbol { glyph: "ش", name: "sheen" },
    SignSymbol { glyph: "ت", name: "ta" },
    SignSymbol { glyph: "ط", name: "taa" },
    SignSymbol { glyph: "ث", name: "thaa" },
    SignSymbol { glyph: "ذ", name: "thal" },
    SignSymbol { glyph: "ة", name: "toot" },
    SignSymbol { glyph: "و", name: "waw" },
    SignSymbol { glyph: "ي", name: "ya" },
    SignSymbol { glyph: "يا", name: "yaa" },
    SignSymbol { glyph: "ز", name: "zay" },
];

/// Fixed table indexed by class id
#[derive(Debug, Clone, Copy)]
pub struct SymbolTable {
    symbols: &'static [SignSymbol],
}

impl SymbolTable {
    /// The 32-class Arabic fingerspelling alphabet
    pub fn arabic() -> Self {
        Self {
            symbols: &ARABIC_ALPHABET,
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, class_id: usize) -> Option<&SignSymbol> {
        self.symbols.get(class_id)
    }

    /// Glyph for `class_id`, or the unknown sentinel when out of range
    pub fn glyph(&self, class_id: usize) -> &'static str {
        self.symbols
            .get(class_id)
            .map(|s| s.glyph)
            .unwrap_or(UNKNOWN_SYMBOL)
    }

    /// Random entry with its class id, used in placeholder mode
    pub fn random(&self) -> Option<(usize, &SignSymbol)> {
        if self.symbols.is_empty() {
            return None;
        }
        let class_id = rand::thread_rng().gen_range(0..self.symbols.len());
        Some((class_id, &self.symbols[class_id]))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::arabic()
    }
}
