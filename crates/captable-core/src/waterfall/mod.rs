pub mod debt;
pub mod distribution;

pub use debt::{debt_obligations, debt_schedule, DebtBalance, DebtInstrument, DebtScheduleRow, InstrumentKind};
pub use distribution::{
    calculate_waterfall, EntryType, WaterfallEntry, WaterfallOutput, WaterfallSummary,
};
