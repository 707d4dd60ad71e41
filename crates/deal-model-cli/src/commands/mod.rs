pub mod irr;
pub mod ma;
pub mod scenarios;
