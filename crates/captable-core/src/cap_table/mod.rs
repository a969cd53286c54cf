pub mod conversion;
pub mod dilution;
pub mod ledger;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Relative tolerance for share-conservation and pool-target checks.
pub const SHARE_TOLERANCE: Decimal = dec!(0.000001);

/// `|a - b| <= tolerance * max(|b|, 1)`
pub fn approx_eq(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    let scale = b.abs().max(Decimal::ONE);
    (a - b).abs() <= tolerance * scale
}

pub use conversion::{calculate_conversion, convert_note, ConversionInput, NoteConversion};
pub use dilution::{build_ledger, build_pre_hybrid_ledger};
pub use ledger::{CapTableEntry, CapTableSummary, Round, RoundKind, RoundLedger, Stakeholder};
