//! Data layer: row types, loading, cleaning and area arithmetic.
//!
//! Architecture:
//! ```text
//!  raw exports (;-delimited, comma decimals)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  read export → RawRecord
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐     ┌───────────┐
//!   │  clean    │ ──► │ reconcile │  all − production → protected
//!   └──────────┘     └───────────┘
//!        │
//!        ▼
//!   ┌──────────┐     ┌──────────┐
//!   │  filter   │ ──► │ prepare   │  unknown → aggregate → cutting
//!   └──────────┘     └──────────┘
//!        │
//!        ▼
//!   AreaTable::pivot  one column per age group
//! ```

pub mod clean;
pub mod filter;
pub mod loader;
pub mod model;
pub mod prepare;
pub mod reconcile;
