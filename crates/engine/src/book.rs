// In crates/engine/src/book.rs

use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct BookState {
    equity: Decimal,
    open: u32,
    reserved: u32,
}

/// Equity and position counts shared by every signal in flight.
///
/// A slot is reserved before an order is submitted and either committed
/// (the order went through) or released (it did not). Counting reservations
/// keeps the `max_positions` limit exact across symbols even though orders
/// for different symbols are submitted concurrently.
#[derive(Debug)]
pub struct PositionBook {
    state: Mutex<BookState>,
    max_positions: u32,
}

impl PositionBook {
    pub fn new(equity: Decimal, max_positions: u32) -> Self {
        Self {
            state: Mutex::new(BookState { equity, open: 0, reserved: 0 }),
            max_positions,
        }
    }

    fn state(&self) -> MutexGuard<'_, BookState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The equity snapshot used for sizing.
    pub fn equity(&self) -> Decimal {
        self.state().equity
    }

    pub fn set_equity(&self, equity: Decimal) {
        self.state().equity = equity;
    }

    pub fn open_positions(&self) -> u32 {
        self.state().open
    }

    pub fn max_positions(&self) -> u32 {
        self.max_positions
    }

    /// Claims a position slot, or returns `None` when the book is full.
    pub fn try_reserve(&self) -> Option<Reservation<'_>> {
        let mut state = self.state();
        if state.open + state.reserved >= self.max_positions {
            return None;
        }
        state.reserved += 1;
        Some(Reservation { book: self, settled: false })
    }
}

/// A claimed position slot. Dropping it without [`Reservation::commit`] gives the slot back.
#[derive(Debug)]
#[must_use = "a reservation is released as soon as it is dropped"]
pub struct Reservation<'a> {
    book: &'a PositionBook,
    settled: bool,
}

impl Reservation<'_> {
    /// Turns the slot into an open position.
    pub fn commit(mut self) {
        let mut state = self.book.state();
        state.reserved -= 1;
        state.open += 1;
        self.settled = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.book.state().reserved -= 1;
        }
    }
}
