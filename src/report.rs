//! Human-readable token report

use std::fmt::Write;

use crate::token::TokenRecord;

/// Format `value` with `decimals` places and comma thousands separators
#[must_use]
pub fn format_amount(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let digits = int_part.len();
    let mut out = String::with_capacity(formatted.len() + digits / 3 + 1);
    if value.is_sign_negative() && value != 0.0 {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 && ch.is_ascii_digit() {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac_part) = frac_part {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Format a USD amount, e.g. `$1,234.56`
#[must_use]
pub fn format_usd(value: f64, decimals: usize) -> String {
    let amount = format_amount(value, decimals);
    match amount.strip_prefix('-') {
        Some(abs) => format!("-${abs}"),
        None => format!("${amount}"),
    }
}

/// Format a 0-100 share, e.g. `12.34%`
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}

/// Render the chat reply for an analysed token
#[must_use]
pub fn render(record: &TokenRecord) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "Token: {} (Chain: {})",
        record.contract_address, record.chain
    );
    let _ = writeln!(text, "Market Cap: {}", format_usd(record.market_cap, 2));
    let _ = writeln!(text, "Price: {}", format_usd(record.price, 4));
    let _ = writeln!(text, "Volume (24h): {}", format_usd(record.volume, 2));
    let _ = writeln!(
        text,
        "Decentralization Score: {}",
        format_percent(record.decentralization_score)
    );
    let _ = writeln!(text, "Supply Distribution:");
    let _ = writeln!(
        text,
        "  - Percent in CEXs: {}",
        format_percent(record.percent_in_cexs)
    );
    let _ = writeln!(
        text,
        "  - Percent in Contracts: {}",
        format_percent(record.percent_in_contracts)
    );

    if !record.top_traders.is_empty() {
        let _ = writeln!(text, "Top Traders:");
        for (rank, trader) in record.top_traders.iter().enumerate() {
            let _ = writeln!(
                text,
                "  {}. {} ({})",
                rank + 1,
                trader.address,
                format_amount(trader.volume, 2)
            );
        }
    }
    text
}
