pub mod estimation;
pub mod pro_forma;
pub mod projection;
pub mod synergy_valuation;

#[cfg(feature = "scenarios")]
pub mod deal;
