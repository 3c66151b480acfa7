use thiserror::Error;

/// Widest decimal scale a `u128` raw amount can carry (10^38 < u128::MAX).
pub const MAX_DECIMALS: u8 = 38;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("'{0}' is not a decimal number")]
    NotANumber(String),
    #[error("'{0}' must be greater than zero")]
    NotPositive(String),
    #[error("'{0}' does not fit in a raw token amount")]
    Overflow(String),
    #[error("{0} decimals is more than a token can declare")]
    TooManyDecimals(u8),
}

fn pow10(exp: u8) -> u128 {
    10u128.pow(exp as u32)
}

/// floor(raw * 10^places / 10^decimals), saturating instead of overflowing.
fn scaled(raw: u128, decimals: u8, places: u8) -> u128 {
    if decimals >= places {
        raw / pow10(decimals - places)
    } else {
        raw.saturating_mul(pow10(places - decimals))
    }
}

/// Parse a raw integer amount as returned by a collaborator.
///
/// Accepts plain decimal digits or a `0x`-prefixed hex quantity.
pub fn parse_raw(raw: &str) -> Result<u128, AmountError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AmountError::Empty);
    }

    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        if hex.is_empty() {
            return Ok(0);
        }
        return u128::from_str_radix(hex, 16).map_err(|e| match e.kind() {
            std::num::IntErrorKind::PosOverflow => AmountError::Overflow(raw.to_string()),
            _ => AmountError::NotANumber(raw.to_string()),
        });
    }

    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::NotANumber(raw.to_string()));
    }

    raw.parse::<u128>()
        .map_err(|_| AmountError::Overflow(raw.to_string()))
}

/// Convert a human decimal amount into the token's smallest unit.
///
/// Fractional digits beyond `decimals` are truncated. Signs, exponents and
/// anything other than digits with at most one `.` are rejected.
pub fn amount_to_raw(amount: &str, decimals: u8) -> Result<u128, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::TooManyDecimals(decimals));
    }

    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }

    let (integer_part, fraction_part) = match amount.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (amount, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (integer_part.is_empty() && fraction_part.is_empty())
        || !all_digits(integer_part)
        || !all_digits(fraction_part)
    {
        return Err(AmountError::NotANumber(amount.to_string()));
    }

    let kept = &fraction_part[..fraction_part.len().min(decimals as usize)];
    let padded = format!("{:0<width$}", kept, width = decimals as usize);
    let digits = format!("{}{}", integer_part, padded);
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return Ok(0);
    }

    trimmed
        .parse::<u128>()
        .map_err(|_| AmountError::Overflow(amount.to_string()))
}

/// Like [`amount_to_raw`] but rejects amounts that are zero in raw units.
pub fn positive_amount_to_raw(amount: &str, decimals: u8) -> Result<u128, AmountError> {
    let raw = amount_to_raw(amount, decimals)?;
    if raw == 0 {
        return Err(AmountError::NotPositive(amount.trim().to_string()));
    }
    Ok(raw)
}

/// Exact human rendering of a raw amount, trailing zeros trimmed.
pub fn raw_to_amount(raw: u128, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }

    let scale = pow10(decimals.min(MAX_DECIMALS));
    let whole = raw / scale;
    let fraction = raw % scale;
    if fraction == 0 {
        return whole.to_string();
    }

    let fraction = format!("{:0>width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Display form of a balance for the wallet panel.
///
/// Truncates, never rounds up, so a displayed balance is never larger than
/// the one held:
/// - `0` → `"0"`
/// - below 0.0001 → `"<0.0001"`
/// - below 1 → four decimals
/// - below 1,000 → two decimals
/// - below 1,000,000 → one decimal and `K`
/// - otherwise one decimal and `M`
pub fn format_balance(raw: u128, decimals: u8) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    if raw == 0 {
        return "0".to_string();
    }

    let ten_thousandths = scaled(raw, decimals, 4);
    if ten_thousandths == 0 {
        return "<0.0001".to_string();
    }

    let whole = scaled(raw, decimals, 0);
    if whole == 0 {
        return format!("0.{:04}", ten_thousandths);
    }

    if whole < 1_000 {
        let hundredths = scaled(raw, decimals, 2);
        return format!("{}.{:02}", hundredths / 100, hundredths % 100);
    }

    if whole < 1_000_000 {
        let tenths_of_k = whole / 100;
        return format!("{}.{}K", tenths_of_k / 10, tenths_of_k % 10);
    }

    let tenths_of_m = whole / 100_000;
    format!("{}.{}M", tenths_of_m / 10, tenths_of_m % 10)
}

/// Minimum accepted output after allowing `bps` basis points of slippage.
pub fn apply_slippage(raw: u128, bps: u16) -> u128 {
    let keep = 10_000u128.saturating_sub(bps as u128);
    raw / 10_000 * keep + raw % 10_000 * keep / 10_000
}
