//! Tag argument tokenizer.
//!
//! Tag arguments and captured context lines are split on whitespace, and
//! every punctuation symbol becomes its own single-character token. Property
//! declarations get one twist: the token holding the type spelling may itself
//! contain symbols (`int[]`, `uint=>string`), so symbol characters are glued
//! into the current token while building result positions two and three.

use std::sync::LazyLock;

use rustc_hash::FxHashSet;

static SYMBOLS: LazyLock<FxHashSet<char>> =
    LazyLock::new(|| "`~!@#$%^&*()+-=|\\/.,';][]}{:><\"".chars().collect());

/// Split `text` into tokens. With `glue_type_tokens` the symbol characters
/// encountered while the result already holds two or three tokens are kept
/// inside the current token instead of splitting it.
pub fn tokenize(text: &str, glue_type_tokens: bool) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    let mut cur = String::new();

    for ch in text.trim().chars() {
        if SYMBOLS.contains(&ch) {
            if glue_type_tokens && (result.len() == 2 || result.len() == 3) {
                cur.push(ch);
                continue;
            }
            if !cur.is_empty() {
                result.push(std::mem::take(&mut cur));
            }
            result.push(ch.to_string());
        } else if ch == ' ' || ch == '\t' {
            if !cur.is_empty() {
                result.push(std::mem::take(&mut cur));
            }
        } else {
            cur.push(ch);
        }
    }
    if !cur.is_empty() {
        result.push(cur);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(text: &str) -> Vec<String> {
        tokenize(text, false)
    }

    #[test]
    fn whitespace_splits() {
        assert_eq!(toks("Item  HasProto\tGlobal"), ["Item", "HasProto", "Global"]);
        assert_eq!(toks("   "), Vec::<String>::new());
    }

    #[test]
    fn symbols_are_single_tokens() {
        assert_eq!(
            toks("void Foo(int a, bool b)"),
            ["void", "Foo", "(", "int", "a", ",", "bool", "b", ")"]
        );
        assert_eq!(toks("uint[]"), ["uint", "[", "]"]);
    }

    #[test]
    fn glue_mode_keeps_type_spellings_whole() {
        // access, entity already consumed upstream; here positions 2 and 3
        // hold the type and the dotted name.
        assert_eq!(
            tokenize("Item Public int[] Stats", true),
            ["Item", "Public", "int[]", "Stats"]
        );
        assert_eq!(
            tokenize("Critter PrivateServer uint=>string Bag.Loot", true),
            ["Critter", "PrivateServer", "uint=>string", "Bag.Loot"]
        );
    }

    #[test]
    fn glue_mode_still_splits_outside_type_positions() {
        assert_eq!(
            tokenize("a b c d e[]", true),
            ["a", "b", "c", "d", "e", "[", "]"]
        );
    }
}
