// Copyright (c) 2026 rezky_nightky

/// Glyph used when a pool is unexpectedly empty.
pub const FALLBACK_GLYPH: char = '0';

#[rustfmt::skip]
const KATAKANA: &[char] = &[
    'ｱ', 'ｲ', 'ｳ', 'ｴ', 'ｵ', 'ｶ', 'ｷ', 'ｸ', 'ｹ', 'ｺ',
    'ｻ', 'ｼ', 'ｽ', 'ｾ', 'ｿ', 'ﾀ', 'ﾁ', 'ﾂ', 'ﾃ', 'ﾄ',
    'ﾅ', 'ﾆ', 'ﾇ', 'ﾈ', 'ﾉ', 'ﾊ', 'ﾋ', 'ﾌ', 'ﾍ', 'ﾎ',
    'ﾏ', 'ﾐ', 'ﾑ', 'ﾒ', 'ﾓ', 'ﾔ', 'ﾕ', 'ﾖ',
    'ﾗ', 'ﾘ', 'ﾙ', 'ﾚ', 'ﾛ', 'ﾜ', 'ｦ', 'ﾝ',
];

#[rustfmt::skip]
const HIRAGANA: &[char] = &[
    'あ', 'い', 'う', 'え', 'お', 'か', 'き', 'く', 'け', 'こ',
    'さ', 'し', 'す', 'せ', 'そ', 'た', 'ち', 'つ', 'て', 'と',
    'な', 'に', 'ぬ', 'ね', 'の', 'は', 'ひ', 'ふ', 'へ', 'ほ',
    'ま', 'み', 'む', 'め', 'も', 'や', 'ゆ', 'よ',
    'ら', 'り', 'る', 'れ', 'ろ', 'わ', 'を', 'ん',
];

#[rustfmt::skip]
const LATIN: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M',
    'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

#[rustfmt::skip]
const GREEK: &[char] = &[
    'Α', 'Β', 'Γ', 'Δ', 'Ε', 'Ζ', 'Η', 'Θ', 'Ι', 'Κ', 'Λ', 'Μ',
    'Ν', 'Ξ', 'Ο', 'Π', 'Ρ', 'Σ', 'Τ', 'Υ', 'Φ', 'Χ', 'Ψ', 'Ω',
];

#[rustfmt::skip]
const CYRILLIC: &[char] = &[
    'А', 'Б', 'В', 'Г', 'Д', 'Е', 'Ё', 'Ж', 'З', 'И', 'Й',
    'К', 'Л', 'М', 'Н', 'О', 'П', 'Р', 'С', 'Т', 'У', 'Ф',
    'Х', 'Ц', 'Ч', 'Ш', 'Щ', 'Ъ', 'Ы', 'Ь', 'Э', 'Ю', 'Я',
];

const NUMBERS: &[char] = &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

#[rustfmt::skip]
const SYMBOLS: &[char] = &[
    '!', '@', '#', '$', '%', '^', '&', '*', '(', ')',
    '-', '_', '+', '=', '[', ']', '{', '}', '|', '\\',
    ':', ';', '"', '\'', '<', '>', ',', '.', '?', '/',
    '~', '`', '✓', '✔', '✕', '✖', '★', '☆', '○', '●',
    '♠', '♣', '♥', '♦', '♤', '♧', '♡', '♢', '☺', '☻',
    '♂', '♀', '♪', '♫', '☼', '§', '¤', '©', '®', '™',
];

#[rustfmt::skip]
const MATH_SYMBOLS: &[char] = &[
    '∞', '≠', '≡', '≤', '≥', '±', '∑', '∏', '∫', '√',
    '∆', '∇', '∂', '∈', '∉', '∅', '∧', '∨', '⊕', '⊗',
];

/// One entry of the character-set catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Charset {
    pub name: &'static str,
    pub glyphs: &'static [char],
    /// Glyph shown next to the name in listings.
    pub symbol: char,
}

pub const CATALOG: [Charset; 8] = [
    Charset {
        name: "katakana",
        glyphs: KATAKANA,
        symbol: 'ｵ',
    },
    Charset {
        name: "hiragana",
        glyphs: HIRAGANA,
        symbol: 'あ',
    },
    Charset {
        name: "latin",
        glyphs: LATIN,
        symbol: 'A',
    },
    Charset {
        name: "greek",
        glyphs: GREEK,
        symbol: 'Ζ',
    },
    Charset {
        name: "cyrillic",
        glyphs: CYRILLIC,
        symbol: 'И',
    },
    Charset {
        name: "numbers",
        glyphs: NUMBERS,
        symbol: '1',
    },
    Charset {
        name: "symbols",
        glyphs: SYMBOLS,
        symbol: '%',
    },
    Charset {
        name: "math",
        glyphs: MATH_SYMBOLS,
        symbol: '√',
    },
];

pub fn charset_from_str(name: &str) -> Result<&'static Charset, String> {
    let name = name.trim().to_ascii_lowercase();
    let canonical = match name.as_str() {
        "kana" => "katakana",
        "english" | "ascii" => "latin",
        "digits" | "dec" | "decimal" => "numbers",
        "punc" => "symbols",
        "mathsymbols" | "math-symbols" | "math_symbols" => "math",
        other => other,
    };
    CATALOG
        .iter()
        .find(|c| c.name == canonical)
        .ok_or_else(|| format!("unsupported charset: {} (see --list-charsets)", name))
}

pub fn parse_user_hex_chars(s: &str) -> Result<Vec<char>, String> {
    let mut out = Vec::new();
    for (i, part) in s.split(',').enumerate() {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let v = u32::from_str_radix(part, 16)
            .map_err(|_| format!("invalid hex char at index {}", i + 1))?;
        let ch = char::from_u32(v)
            .ok_or_else(|| format!("invalid unicode scalar at index {}", i + 1))?;
        out.push(ch);
    }
    Ok(out)
}

/// Expands `LOW,HIGH` code point pairs into the glyphs they cover.
pub fn expand_user_ranges(list: &[char]) -> Result<Vec<char>, String> {
    if list.len() % 2 != 0 {
        return Err("--chars: odd number of unicode chars given (must be even)".to_string());
    }
    let mut out = Vec::new();
    for pair in list.chunks(2) {
        let (a, b) = (pair[0] as u32, pair[1] as u32);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        out.extend((lo..=hi).filter_map(char::from_u32));
    }
    Ok(out)
}

/// The live glyph pool, built as the union of toggled catalog sets plus any
/// user supplied extras.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    chars: Vec<char>,
}

impl Selection {
    pub fn new(sets: &[&Charset], extra: &[char]) -> Self {
        let mut sel = Self::default();
        for set in sets {
            if !sel.is_active(set) {
                sel.chars.extend_from_slice(set.glyphs);
            }
        }
        sel.chars.extend_from_slice(extra);
        sel
    }

    /// A set counts as active when every one of its glyphs is in the pool.
    pub fn is_active(&self, set: &Charset) -> bool {
        set.glyphs.iter().all(|g| self.chars.contains(g))
    }

    pub fn toggle(&mut self, set: &Charset) {
        if self.is_active(set) {
            self.chars.retain(|g| !set.glyphs.contains(g));
        } else {
            self.chars.extend_from_slice(set.glyphs);
        }
    }

    /// Glyphs to draw from. Never empty: an empty selection falls back to
    /// binary digits.
    pub fn pool(&self) -> Vec<char> {
        if self.chars.is_empty() {
            vec!['0', '1']
        } else {
            self.chars.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(name: &str) -> &'static Charset {
        charset_from_str(name).unwrap()
    }

    #[test]
    fn parse_user_hex_chars_parses_hex_codepoints() {
        let v = parse_user_hex_chars("30,31").unwrap();
        assert_eq!(v, vec!['0', '1']);
    }

    #[test]
    fn user_ranges_expand_inclusively() {
        let v = expand_user_ranges(&['a', 'c', 'X', 'X']).unwrap();
        assert_eq!(v, vec!['a', 'b', 'c', 'X']);
        assert!(expand_user_ranges(&['a']).is_err());
    }

    #[test]
    fn aliases_resolve_to_catalog_entries() {
        assert_eq!(set("digits").name, "numbers");
        assert_eq!(set(" Katakana ").name, "katakana");
        assert!(charset_from_str("klingon").is_err());
    }

    #[test]
    fn every_symbol_belongs_to_its_set() {
        for c in &CATALOG {
            assert!(c.glyphs.contains(&c.symbol), "{}", c.name);
        }
    }

    #[test]
    fn toggle_adds_then_removes_a_set() {
        let mut sel = Selection::new(&[set("numbers")], &[]);
        assert!(!sel.is_active(set("latin")));

        sel.toggle(set("latin"));
        assert!(sel.is_active(set("latin")));
        assert!(sel.is_active(set("numbers")));

        sel.toggle(set("latin"));
        assert!(!sel.is_active(set("latin")));
        assert_eq!(sel.pool(), NUMBERS.to_vec());
    }

    #[test]
    fn empty_selection_falls_back_to_binary() {
        let mut sel = Selection::new(&[set("numbers")], &[]);
        sel.toggle(set("numbers"));
        assert_eq!(sel.pool(), vec!['0', '1']);
    }

    #[test]
    fn duplicate_sets_are_added_once() {
        let sel = Selection::new(&[set("latin"), set("latin")], &[]);
        assert_eq!(sel.pool().len(), LATIN.len());
    }
}
