use super::moving_average::calculate_ema_series;

/// Latest MACD reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl Macd {
    /// MACD line above its signal line
    pub fn is_bullish(&self) -> bool {
        self.line > self.signal
    }
}

/// Calculate MACD (Moving Average Convergence Divergence)
///
/// Line = EMA(fast) - EMA(slow), signal = EMA(signal) of the line.
/// Needs `slow + signal - 1` prices.
pub fn calculate_macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Option<Macd> {
    if fast == 0 || fast >= slow || signal == 0 || prices.len() < slow + signal - 1 {
        return None;
    }

    let fast_ema = calculate_ema_series(prices, fast);
    let slow_ema = calculate_ema_series(prices, slow);

    // Align both series on the bars where the slow EMA exists
    let offset = slow - fast;
    let line: Vec<f64> = slow_ema
        .iter()
        .zip(&fast_ema[offset..])
        .map(|(s, f)| f - s)
        .collect();

    let signal_series = calculate_ema_series(&line, signal);
    let signal_value = *signal_series.last()?;
    let line_value = *line.last()?;

    Some(Macd {
        line: line_value,
        signal: signal_value,
        histogram: line_value - signal_value,
    })
}
