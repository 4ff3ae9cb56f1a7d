pub mod coingecko;
pub mod worldbank;
