pub mod compare;
pub mod export_market_data;
pub mod generate_sample_data;
pub mod run;
