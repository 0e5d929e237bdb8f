pub mod bcb;
pub mod fetcher;
pub mod rate_series;
pub mod util;
pub mod yahoo_finance;
