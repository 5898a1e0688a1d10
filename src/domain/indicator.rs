//! Indicator series over closing prices.
//!
//! Each function returns one entry per input price; entries inside the warmup
//! window are `None`.

/// Simple moving average. Warmup: first (n-1) values.
pub fn sma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; closes.len()];
    }

    let mut values = Vec::with_capacity(closes.len());
    let mut sum = 0.0;
    for (i, &close) in closes.iter().enumerate() {
        sum += close;
        if i >= period {
            sum -= closes[i - period];
        }
        if i + 1 >= period {
            values.push(Some(sum / period as f64));
        } else {
            values.push(None);
        }
    }
    values
}

/// Exponential moving average, k = 2/(n+1), seeded with the SMA of the first
/// n values. Warmup: first (n-1) values.
pub fn ema(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let present: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();
    ema_of(&present, period)
}

/// EMA over a series that may start with a warmup gap; the gap is skipped and
/// the seed taken from the first `period` present values.
fn ema_of(series: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; series.len()];
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut values = Vec::with_capacity(series.len());
    let mut seen = 0usize;
    let mut sum = 0.0;
    let mut current: Option<f64> = None;

    for value in series {
        let Some(x) = *value else {
            values.push(None);
            continue;
        };
        seen += 1;
        current = match current {
            Some(prev) => Some(x * k + prev * (1.0 - k)),
            None => {
                sum += x;
                (seen == period).then(|| sum / period as f64)
            }
        };
        values.push(current);
    }
    values
}

/// Relative strength index using simple rolling means of gains and losses
/// over the last n price changes. Warmup: first n values. With no losses in
/// the window the RSI is 100.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut values = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return values;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    for i in period..closes.len() {
        let window = &changes[i - period..i];
        let avg_gain = window.iter().filter(|c| **c > 0.0).sum::<f64>() / period as f64;
        let avg_loss = -window.iter().filter(|c| **c < 0.0).sum::<f64>() / period as f64;
        let value = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        };
        values[i] = Some(value);
    }
    values
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line = EMA(fast) - EMA(slow); signal = EMA(signal) of the line.
/// Warmup: first (slow + signal - 2) values.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<Option<MacdPoint>> {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema_of(&line, signal);

    line.iter()
        .zip(&signal_line)
        .map(|(l, s)| {
            let (line, signal) = ((*l)?, (*s)?);
            Some(MacdPoint {
                line,
                signal,
                histogram: line - signal,
            })
        })
        .collect()
}
