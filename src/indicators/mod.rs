// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator functions over candle/close slices. Every
// public function returns `Option<T>` (or a possibly-empty series) so callers
// are forced to handle insufficient-data and numerical edge cases.

pub mod adx;
pub mod atr;
pub mod ema;
pub mod rsi;
