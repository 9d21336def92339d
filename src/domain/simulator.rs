//! Single-position trade simulator.
//!
//! Folds one symbol's signal stream through a two-state machine:
//!
//! - `Flat --BUY--> Long`   records the entry
//! - `Long --SELL--> Flat`  emits a [`Trade`]
//! - every other (state, signal) pair is a no-op
//!
//! A position still open after the last signal is dropped without a trade.

use tracing::trace;

use crate::domain::error::SignalError;
use crate::domain::position::{Position, Trade};
use crate::domain::signal::{Signal, SignalType};

/// Checks every signal belongs to `symbol` and carries a usable price.
pub fn validate_signals(symbol: &str, signals: &[Signal]) -> Result<(), SignalError> {
    for signal in signals {
        if signal.symbol != symbol {
            return Err(SignalError::SymbolMismatch {
                expected: symbol.to_string(),
                found: signal.symbol.clone(),
            });
        }
        signal.validate()?;
    }
    Ok(())
}

/// Advances the state machine by one signal, returning the trade it closes.
pub fn step(position: &mut Position, symbol: &str, signal: &Signal) -> Option<Trade> {
    match (*position, signal.signal_type) {
        (Position::Flat, SignalType::Buy) => {
            *position = Position::Long {
                entry_price: signal.price,
                entry_date: signal.date,
            };
            None
        }
        (
            Position::Long {
                entry_price,
                entry_date,
            },
            SignalType::Sell,
        ) => {
            *position = Position::Flat;
            Some(Trade::close(
                symbol,
                entry_date,
                entry_price,
                signal.date,
                signal.price,
            ))
        }
        _ => {
            trace!(symbol, date = %signal.date, kind = %signal.signal_type, "signal ignored");
            None
        }
    }
}

/// Validates, stably sorts by date, and replays the signals. Same-date
/// signals keep their input order.
pub fn simulate_trades(symbol: &str, signals: &[Signal]) -> Result<Vec<Trade>, SignalError> {
    validate_signals(symbol, signals)?;

    let mut ordered: Vec<&Signal> = signals.iter().collect();
    ordered.sort_by_key(|s| s.date);

    let mut position = Position::Flat;
    let trades = ordered
        .into_iter()
        .filter_map(|signal| step(&mut position, symbol, signal))
        .collect();

    Ok(trades)
}
