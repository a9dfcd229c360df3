use crate::error::ExchangeError;
use crate::state::Trader;
use crate::swap::SwapQuote;

/// Trader record after `quote` is settled. Counters only grow.
pub fn record_swap(trader: &Trader, quote: &SwapQuote) -> Result<Trader, ExchangeError> {
    let mut trader = trader.clone();
    trader.volume_in = trader
        .volume_in
        .checked_add(quote.amount_in)
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    trader.volume_out = trader
        .volume_out
        .checked_add(quote.amount_out)
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    trader.swap_count = trader
        .swap_count
        .checked_add(1)
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    Ok(trader)
}

/// True when no counter of `after` is below `before`.
pub fn is_monotonic(before: &Trader, after: &Trader) -> bool {
    after.volume_in >= before.volume_in
        && after.volume_out >= before.volume_out
        && after.swap_count >= before.swap_count
}
