/// Parses a human duration string into milliseconds.
///
/// Accepts any sequence of `<digits><unit>` groups where the unit is one of
/// `s`, `m`, `h` or `d`, e.g. `"30s"`, `"2m"`, `"1d12h"`. Returns `None` for
/// malformed input or on overflow.
pub fn parse_duration(input: &str) -> Option<u64> {
    let mut total: u64 = 0;
    let mut rest = input;

    while !rest.is_empty() {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }

        let number: u64 = rest[..digits].parse().ok()?;
        let mut chars = rest[digits..].chars();
        let multiplier = match chars.next()? {
            's' => 1_000,
            'm' => 60 * 1_000,
            'h' => 60 * 60 * 1_000,
            'd' => 24 * 60 * 60 * 1_000,
            _ => return None,
        };

        total = total.checked_add(number.checked_mul(multiplier)?)?;
        rest = chars.as_str();
    }

    Some(total)
}
