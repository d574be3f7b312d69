/// Data layer: core types, loading, and export.
///
/// Architecture:
/// ```text
///  .csv / .xlsx
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse bytes → Dataset (cached by content hash)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset   │  Vec<Row>, ordered column names; annotated in place
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  Dataset → .xlsx bytes / data URI / file
///   └──────────┘
/// ```

pub mod export;
pub mod loader;
pub mod model;
