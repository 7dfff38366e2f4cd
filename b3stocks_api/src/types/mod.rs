mod envelope;
pub use self::envelope::UpstreamError;

mod chart;
pub use self::chart::{AdjClose, ChartEnvelope, ChartMeta, ChartResponse, ChartResult, Indicators, QuoteIndicator};

mod quote_summary;
pub use self::quote_summary::{
    raw_value, AssetProfile, PriceModule, QuoteSummaryEnvelope, QuoteSummaryResponse,
    QuoteSummaryResult, RawValue, SummaryDetail,
};
