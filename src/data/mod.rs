/// Data layer: dataset access and the spectral / imaging computations.
///
/// Architecture:
/// ```text
///  Bruker .d (analysis.tsf + timsdata)      demo generator
///        │                                        │
///        ▼                                        ▼
///   ┌──────────┐  schema check  ┌────────────┐  ┌───────────────┐
///   │  loader   │ ─────────────▶ │ TsfDataset  │  │ MemoryDataset  │
///   └──────────┘                └────────────┘  └───────────────┘
///                                      └───── FrameSource ─────┘
///                                                 │
///                       ┌─────────────────────────┼──────────────────┐
///                       ▼                         ▼                  ▼
///                ┌────────────┐           ┌─────────────┐     ┌──────────┐
///                │  average    │ ◀─cache─▶ │  parquet     │     │ ion_image │
///                └────────────┘           └─────────────┘     └──────────┘
///                                                                   │
///                                                   filter: trim + tolerance
/// ```

pub mod average;
pub mod filter;
pub mod ion_image;
pub mod loader;
pub mod model;
pub mod synthetic;
pub mod tsf;
