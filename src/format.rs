use chrono::{DateTime, Utc};

/// Precio en USD con decimales suficientes para tokens de fracciones de centavo.
pub fn format_price(price: f64) -> String {
    if price >= 1.0 {
        format!("${:.2}", price)
    } else if price >= 0.01 {
        format!("${:.4}", price)
    } else {
        format!("${:.8}", price)
    }
}

/// Montos grandes abreviados: $1.2K, $3.4M, $5.6B.
pub fn format_usd_compact(amount: f64) -> String {
    let abs = amount.abs();
    if abs >= 1e9 {
        format!("${:.1}B", amount / 1e9)
    } else if abs >= 1e6 {
        format!("${:.1}M", amount / 1e6)
    } else if abs >= 1e3 {
        format!("${:.1}K", amount / 1e3)
    } else {
        format!("${:.0}", amount)
    }
}

pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => "never".to_string(),
    }
}
