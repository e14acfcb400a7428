/// Encode a 1-based loop number as a base-26 letter label:
/// 1 → `A`, 26 → `Z`, 27 → `AA`, 28 → `AB`, ...
///
/// Zero has no label and encodes to the empty string.
pub fn generate_loop_label(mut n: u32) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        letters.push(b'A' + ((n - 1) % 26) as u8);
        n = (n - 1) / 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// Inverse of [`generate_loop_label`]. `None` unless the label is a
/// non-empty run of `A`..=`Z` that fits in a `u32`.
pub fn parse_loop_label(label: &str) -> Option<u32> {
    if label.is_empty() {
        return None;
    }
    label.bytes().try_fold(0u32, |n, b| {
        if !b.is_ascii_uppercase() {
            return None;
        }
        n.checked_mul(26)?.checked_add((b - b'A') as u32 + 1)
    })
}
