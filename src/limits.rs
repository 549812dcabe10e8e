//! Bounds on nesting and scanning, so that pathological input can not
//! exhaust the stack or make the parser quadratic.

/// Maximum nesting depth of block containers (quotes, list items).
/// Deeper content is kept as paragraph text.
pub(crate) const MAX_BLOCK_NESTING: usize = 32;

/// Maximum nesting depth of inline spans rendered inside link text.
pub(crate) const MAX_INLINE_NESTING: usize = 32;

/// Maximum bracket depth while looking for the end of link text.
pub(crate) const MAX_BRACKET_DEPTH: usize = 8;

/// Maximum parentheses nesting in a link destination.
pub(crate) const MAX_LINK_PAREN_DEPTH: usize = 32;

/// Backtick runs longer than this are literal text.
pub(crate) const MAX_CODE_SPAN_BACKTICKS: usize = 32;

/// Maximum number of emphasis openers waiting for a closer in one block.
pub(crate) const MAX_DELIMITER_STACK: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_reasonable() {
        const { assert!(MAX_BLOCK_NESTING >= 16) };
        const { assert!(MAX_BLOCK_NESTING <= 64) };
        const { assert!(MAX_INLINE_NESTING >= MAX_BRACKET_DEPTH) };
        const { assert!(MAX_CODE_SPAN_BACKTICKS >= 16) };
    }
}
