//! Display helpers for terminal output.

/// Abbreviate a hex address as `0x1234...abcd` for compact display.
///
/// Anything that is not plain ASCII is returned unchanged.
pub fn abbreviate_address(addr: &str) -> String {
    if addr.len() > 10 && addr.is_ascii() {
        format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
    } else {
        addr.to_string()
    }
}

/// `"1 recipient"`, `"3 recipients"`.
pub fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
