//! Price normalization and console formatting

/// Number of prices shown per side
pub const QUOTE_LEN: usize = 5;
/// Placeholder for a missing sell order
pub const SELL_SENTINEL: u32 = 4096;
/// Placeholder for a missing buy order
pub const BUY_SENTINEL: u32 = 0;

/// Width the item text is padded to on the console
const TEXT_COLUMNS: usize = 40;

/// Fixed-length price lists, each sorted descending and right-padded with sentinels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub sell: [u32; QUOTE_LEN],
    pub buy: [u32; QUOTE_LEN],
}

impl PriceQuote {
    /// Normalize unordered order prices.
    ///
    /// With more than five orders per side the most competitive ones are
    /// kept: the cheapest sells and the highest buys.
    pub fn from_orders(sell: Vec<u32>, buy: Vec<u32>) -> Self {
        Self {
            sell: normalize(sell, SELL_SENTINEL, Keep::Lowest),
            buy: normalize(buy, BUY_SENTINEL, Keep::Highest),
        }
    }

    /// Number of real (non-sentinel) sell prices
    pub fn sell_count(&self) -> usize {
        self.sell.iter().filter(|&&p| p != SELL_SENTINEL).count()
    }

    /// Number of real (non-sentinel) buy prices
    pub fn buy_count(&self) -> usize {
        self.buy.iter().filter(|&&p| p != BUY_SENTINEL).count()
    }
}

#[derive(Clone, Copy)]
enum Keep {
    Lowest,
    Highest,
}

fn normalize(mut prices: Vec<u32>, sentinel: u32, keep: Keep) -> [u32; QUOTE_LEN] {
    prices.sort_unstable();
    if prices.len() > QUOTE_LEN {
        match keep {
            Keep::Lowest => prices.truncate(QUOTE_LEN),
            Keep::Highest => {
                prices.drain(..prices.len() - QUOTE_LEN);
            }
        }
    }
    prices.reverse();

    let mut out = [sentinel; QUOTE_LEN];
    out[..prices.len()].copy_from_slice(&prices);
    out
}

fn price_cells(prices: &[u32], sentinel: u32) -> String {
    prices
        .iter()
        .map(|&p| {
            if p == sentinel {
                "   ".to_string()
            } else {
                format!("{:>3}", p)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One console line: `<text> sell|buy: <sells> | <buys>[ VAULTED]`
pub fn format_price_line(text: &str, quote: &PriceQuote, vaulted: bool) -> String {
    format!(
        "{:<width$} sell|buy: {} | {}{}",
        text,
        price_cells(&quote.sell, SELL_SENTINEL),
        price_cells(&quote.buy, BUY_SENTINEL),
        if vaulted { " VAULTED" } else { "" },
        width = TEXT_COLUMNS
    )
}
